//! Error types for epiqa.
//!
//! One enum covers every failure category in the workspace. The pipeline stage
//! categories (translation, execution, generation, retrieval) map one-to-one to
//! the collaborator a stage calls, so the orchestrator can label degraded output
//! by cause.

use thiserror::Error;

/// Unified error type for epiqa.
///
/// All fallible functions return `Result<T, AppError>`. Errors are represented
/// and propagated, never panicked on.
#[derive(Error, Debug)]
pub enum AppError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O and filesystem errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Natural language to query translation failed
    #[error("Translation error: {0}")]
    Translation(String),

    /// Structured store could not run a query
    #[error("Execution error: {0}")]
    Execution(String),

    /// Text generator failed or returned unusable output
    #[error("Generation error: {0}")]
    Generation(String),

    /// Document index search or indexing failed
    #[error("Retrieval error: {0}")]
    Retrieval(String),

    /// Fault outside every stage guard of the orchestrator
    #[error("Orchestration error: {0}")]
    Orchestration(String),

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
    fn test_stage_errors_keep_cause_text() {
        let err = AppError::Execution("table missing".to_string());
        assert_eq!(err.to_string(), "Execution error: table missing");

        let err = AppError::Retrieval("index offline".to_string());
        assert!(err.to_string().contains("index offline"));
    }

    #[test]
    fn test_json_error_conversion() {
        let parse = serde_json::from_str::<serde_json::Value>("{not json");
        let err: AppError = parse.unwrap_err().into();
        assert!(matches!(err, AppError::Serialization(_)));
    }
}
