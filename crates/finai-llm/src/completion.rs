//! Single-turn generation requests and their answers

use crate::Message;
use serde::{Deserialize, Serialize};

/// Default output budget when the caller sets none
pub const DEFAULT_MAX_TOKENS: usize = 1024;

/// One prompt (plus optional documents) sent to a backend
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionRequest {
    /// Backend model identifier
    pub model: String,
    /// User turn(s); the pipeline sends exactly one
    pub messages: Vec<Message>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,
    pub max_tokens: usize,
    /// Backend default when `None`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stop_sequences: Option<Vec<String>>,
}

impl CompletionRequest {
    pub fn builder(model: impl Into<String>) -> CompletionRequestBuilder {
        CompletionRequestBuilder::new(model)
    }

    /// Number of documents attached across all messages
    pub fn document_count(&self) -> usize {
        self.messages.iter().map(Message::document_count).sum()
    }
}

/// Backend answer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionResponse {
    pub message: Message,
    pub stop_reason: StopReason,
    pub usage: TokenUsage,
}

impl CompletionResponse {
    /// Concatenated text of the answer
    pub fn text(&self) -> String {
        self.message.text_content()
    }

    /// The backend stopped before finishing the answer
    pub fn is_truncated(&self) -> bool {
        self.stop_reason == StopReason::MaxTokens
    }
}

/// Why the backend stopped generating
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    EndTurn,
    /// Output budget exhausted
    MaxTokens,
    StopSequence,
    /// Output withheld by the backend's safety filters
    ContentFilter,
}

/// Token accounting reported by the backend
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub input_tokens: usize,
    pub output_tokens: usize,
}

impl TokenUsage {
    pub fn total(&self) -> usize {
        self.input_tokens + self.output_tokens
    }
}

/// Builder for [`CompletionRequest`]
#[derive(Debug)]
pub struct CompletionRequestBuilder {
    request: CompletionRequest,
}

impl CompletionRequestBuilder {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            request: CompletionRequest {
                model: model.into(),
                messages: Vec::new(),
                system: None,
                max_tokens: DEFAULT_MAX_TOKENS,
                temperature: None,
                stop_sequences: None,
            },
        }
    }

    pub fn add_message(mut self, message: Message) -> Self {
        self.request.messages.push(message);
        self
    }

    pub fn system(self, system: impl Into<String>) -> Self {
        self.maybe_system(Some(system.into()))
    }

    /// Set or clear the system instruction
    pub fn maybe_system(mut self, system: Option<String>) -> Self {
        self.request.system = system.filter(|s| !s.trim().is_empty());
        self
    }

    pub fn max_tokens(mut self, max_tokens: usize) -> Self {
        self.request.max_tokens = max_tokens;
        self
    }

    pub fn temperature(mut self, temperature: Option<f32>) -> Self {
        self.request.temperature = temperature;
        self
    }

    pub fn stop_sequences(mut self, sequences: Vec<String>) -> Self {
        self.request.stop_sequences = (!sequences.is_empty()).then_some(sequences);
        self
    }

    pub fn build(self) -> CompletionRequest {
        self.request
    }
}
