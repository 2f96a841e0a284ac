//! Error types for configuration and the analysis pipeline

use finai_data::DataLoadError;
use finai_llm::LLMError;
use finai_prompt::PromptError;
use finai_utils::EnvError;
use thiserror::Error;

/// Invalid configuration or unrecognised user selection
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Segment code not present in the segment table
    #[error("Unknown segment '{0}'")]
    UnknownSegment(String),

    /// Macro KPI name not recognised
    #[error("Unknown macro KPI '{0}'")]
    UnknownKpi(String),

    /// Generation provider name not recognised
    #[error("Unknown provider '{0}'")]
    UnknownProvider(String),

    /// An environment variable could not be parsed
    #[error(transparent)]
    Env(#[from] EnvError),

    /// A value failed validation
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Failures of the strict pipeline, or the fatal ones of the lenient pipeline
#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Data load failed: {0}")]
    Data(#[from] DataLoadError),

    #[error("Prompt rendering failed: {0}")]
    Prompt(#[from] PromptError),

    #[error("Generation failed: {0}")]
    Generation(#[from] LLMError),
}

/// Result type alias for the analysis crate
pub type Result<T> = std::result::Result<T, AnalysisError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages() {
        let err = AnalysisError::from(ConfigError::UnknownSegment("XX".to_string()));
        assert_eq!(err.to_string(), "Unknown segment 'XX'");

        let err = AnalysisError::from(LLMError::AuthenticationFailed);
        assert_eq!(
            err.to_string(),
            "Generation failed: Invalid API key or authentication failed"
        );
    }
}
