//! Error types for Groundwork.
//!
//! This module defines a unified error enum covering every error category
//! that crosses crate boundaries: configuration, I/O, the language-model
//! client, answer generation, prompt rendering, source adapters and
//! serialization.

use thiserror::Error;

/// Unified error type for Groundwork.
///
/// Library functions return `Result<T, AppError>`. Source-adapter failures
/// have their own richer type in the retrieval crate and are folded into
/// [`AppError::Adapter`] only when they have to leave that crate.
#[derive(Error, Debug)]
pub enum AppError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O and filesystem errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// LLM provider transport/protocol errors
    #[error("LLM error: {0}")]
    Llm(String),

    /// Answer generation failed after the provider was reached
    #[error("Generation error: {0}")]
    Generation(String),

    /// Prompt loading and rendering errors
    #[error("Prompt error: {0}")]
    Prompt(String),

    /// Source adapter errors
    #[error("Adapter error: {0}")]
    Adapter(String),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Generic errors
    #[error("{0}")]
    Other(String),
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

impl From<serde_yaml::Error> for AppError {
    fn from(err: serde_yaml::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

/// Convenience type alias for Results with AppError.
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_prefixes() {
        assert_eq!(
            AppError::Config("missing key".to_string()).to_string(),
            "Configuration error: missing key"
        );
        assert_eq!(
            AppError::Generation("timeout".to_string()).to_string(),
            "Generation error: timeout"
        );
        assert_eq!(AppError::Other("plain".to_string()).to_string(), "plain");
    }

    #[test]
    fn test_from_serde_json() {
        let err = serde_json::from_str::<serde_json::Value>("{not json").unwrap_err();
        let app: AppError = err.into();
        assert!(matches!(app, AppError::Serialization(_)));
    }
}
