//! Error types for docask.
//!
//! One enum covers every failure category of the question-answering
//! pipeline. Whether an error is fatal depends on the stage that observes it:
//! the same `ModelInvocation` error downgrades a single directive during
//! sub-answer synthesis but aborts the run during planning.

use thiserror::Error;

/// Unified error type for docask.
///
/// All fallible functions return `Result<T, AppError>`.
#[derive(Error, Debug)]
pub enum AppError {
    /// No model resolves for a task, or the configuration is invalid.
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O and filesystem errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A provider call failed.
    #[error("Model invocation error: {0}")]
    ModelInvocation(String),

    /// The planner produced unusable output after its retry.
    #[error("Planning error: {0}")]
    Planning(String),

    /// A single directive's search and answer exceeded its time budget.
    #[error("Retrieval timed out: {0}")]
    RetrievalTimeout(String),

    /// A pipeline stage exceeded its time budget.
    #[error("Timed out: {0}")]
    Timeout(String),

    /// The run was cancelled by the caller.
    #[error("Cancelled: {0}")]
    Cancelled(String),

    /// Index and retrieval errors
    #[error("Knowledge error: {0}")]
    Knowledge(String),

    /// Prompt system errors
    #[error("Prompt error: {0}")]
    Prompt(String),

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
    fn test_error_messages() {
        let err = AppError::Config("no model for task 'chat'".to_string());
        assert_eq!(err.to_string(), "Configuration error: no model for task 'chat'");

        let err = AppError::Planning("empty strategy".to_string());
        assert!(err.to_string().starts_with("Planning error"));
    }

    #[test]
    fn test_from_serde_json() {
        let parse: Result<serde_json::Value, _> = serde_json::from_str("{not json");
        let err: AppError = parse.unwrap_err().into();
        assert!(matches!(err, AppError::Serialization(_)));
    }
}
