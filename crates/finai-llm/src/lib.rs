//! Generation backend abstraction for finai
//!
//! This crate provides provider-agnostic abstractions for sending a rendered
//! prompt to a Large Language Model. It includes:
//!
//! - Message types, including inline document attachments
//! - Completion request/response types
//! - Provider trait for LLM implementations
//! - [`GenerationClient`], the single-prompt entry point with a deadline
//! - Concrete provider implementations (behind feature flags)

pub mod attachment;
pub mod client;
pub mod completion;
pub mod error;
pub mod messages;
pub mod provider;

// Re-export main types
pub use attachment::load_document;
pub use client::{GenerationClient, GenerationSettings};
pub use completion::{
    CompletionRequest, CompletionRequestBuilder, CompletionResponse, DEFAULT_MAX_TOKENS, StopReason,
    TokenUsage,
};
pub use error::{LLMError, Result};
pub use messages::{ContentBlock, DocumentSource, Message, MessageContent, Role};
pub use provider::LLMProvider;

// Provider implementations (feature-gated)
#[cfg(any(feature = "gemini", feature = "openai"))]
pub mod providers;
