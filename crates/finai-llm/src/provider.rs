//! Generation backend trait

use crate::{CompletionRequest, CompletionResponse, Result};
use async_trait::async_trait;

/// A backend that turns one [`CompletionRequest`] into one answer
///
/// Implementations translate the request (text plus inline documents) to
/// their wire format and map HTTP failures through [`crate::LLMError`].
#[async_trait]
pub trait LLMProvider: Send + Sync {
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse>;

    /// Short backend name used in logs
    fn name(&self) -> &str;
}
