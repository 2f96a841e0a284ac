//! Error types for prompt operations

use thiserror::Error;

/// Result type for prompt operations
pub type Result<T> = std::result::Result<T, PromptError>;

/// Errors that can occur while loading or rendering templates
#[derive(Error, Debug)]
pub enum PromptError {
    /// Template parsing failed
    #[error("Failed to parse template '{name}': {detail}")]
    TemplateParseFailed { name: String, detail: String },

    /// Template rendering failed, including placeholders without a context value
    #[error("Failed to render template '{name}': {detail}")]
    RenderError { name: String, detail: String },

    /// Lock error for thread safety
    #[error("Lock error: {0}")]
    LockError(String),

    /// File loading error
    #[error("Failed to load template file '{path}': {detail}")]
    FileLoadError { path: String, detail: String },

    /// Context serialization error
    #[error("Failed to serialize variables: {0}")]
    SerializationError(String),
}
