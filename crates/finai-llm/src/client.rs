//! Single-prompt generation on top of an [`LLMProvider`]

use crate::{CompletionRequest, LLMError, LLMProvider, Message, Result, load_document};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

/// Request parameters applied to every generation
#[derive(Debug, Clone)]
pub struct GenerationSettings {
    /// Model identifier passed to the backend
    pub model: String,
    /// Upper bound on generated tokens
    pub max_tokens: usize,
    /// Sampling temperature; backend default when `None`
    pub temperature: Option<f32>,
    /// Optional system instruction
    pub system_prompt: Option<String>,
    /// End-to-end deadline for one generation, attachment read included
    pub timeout: Duration,
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            model: "gemini-2.0-flash".to_string(),
            max_tokens: 8192,
            temperature: None,
            system_prompt: None,
            timeout: Duration::from_secs(120),
        }
    }
}

/// Sends a rendered prompt, optionally with one document, and returns the text answer
#[derive(Clone)]
pub struct GenerationClient {
    provider: Arc<dyn LLMProvider>,
    settings: GenerationSettings,
}

impl GenerationClient {
    pub fn new(provider: Arc<dyn LLMProvider>, settings: GenerationSettings) -> Self {
        Self { provider, settings }
    }

    pub fn settings(&self) -> &GenerationSettings {
        &self.settings
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    /// Generate a response for `prompt`
    ///
    /// When `attachment` is given the file is read, base64-encoded and sent
    /// as a document next to the prompt. The whole call is bounded by
    /// [`GenerationSettings::timeout`].
    #[instrument(skip(self, prompt), fields(provider = %self.provider.name(), model = %self.settings.model))]
    pub async fn generate_response(&self, prompt: &str, attachment: Option<&Path>) -> Result<String> {
        let deadline = self.settings.timeout;

        match tokio::time::timeout(deadline, self.generate_inner(prompt, attachment)).await {
            Ok(result) => result,
            Err(_) => {
                warn!(timeout_secs = deadline.as_secs(), "generation timed out");
                Err(LLMError::Timeout(deadline))
            }
        }
    }

    async fn generate_inner(&self, prompt: &str, attachment: Option<&Path>) -> Result<String> {
        let documents = match attachment {
            Some(path) => vec![load_document(path).await?],
            None => Vec::new(),
        };

        let request = CompletionRequest::builder(&self.settings.model)
            .add_message(Message::user_with_documents(prompt, documents))
            .maybe_system(self.settings.system_prompt.clone())
            .max_tokens(self.settings.max_tokens)
            .temperature(self.settings.temperature)
            .build();

        debug!(
            prompt_chars = prompt.len(),
            documents = request.document_count(),
            "dispatching generation request"
        );
        let response = self.provider.complete(request).await?;

        let text = response.text();
        if text.trim().is_empty() {
            return Err(LLMError::UnexpectedResponse(
                "Backend returned no text".to_string(),
            ));
        }
        if response.is_truncated() {
            warn!(max_tokens = self.settings.max_tokens, "answer cut at the output budget");
        }

        info!(
            stop_reason = ?response.stop_reason,
            tokens = response.usage.total(),
            "generation completed"
        );
        Ok(text)
    }
}

impl std::fmt::Debug for GenerationClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GenerationClient")
            .field("provider", &self.provider.name())
            .field("settings", &self.settings)
            .finish()
    }
}
