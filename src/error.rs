use std::fmt;
use thiserror::Error;

/// Main error type for AI Block
#[derive(Error, Debug)]
pub enum AiblockError {
    /// Database-related errors
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// File system I/O errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Malformed request input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Embedding or completion service unreachable or erroring
    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),

    /// Model returned unusable output
    #[error("Generation failed: {0}")]
    Generation(String),

    /// GraphQL endpoint returned an error
    #[error("GraphQL execution failed: {0}")]
    Execution(String),

    /// GraphQL endpoint did not answer within the configured timeout
    #[error("GraphQL execution timed out after {0}s")]
    ExecutionTimeout(u64),

    /// Retrieval produced no schema fragments
    #[error("No relevant schema chunks found")]
    NoContext,
}

impl AiblockError {
    /// Short machine-readable name used in HTTP error bodies.
    pub fn kind(&self) -> &'static str {
        match self {
            AiblockError::Database(_) => "database",
            AiblockError::Io(_) => "io",
            AiblockError::Serialization(_) => "serialization",
            AiblockError::Config(_) => "config",
            AiblockError::InvalidInput(_) => "invalid_input",
            AiblockError::ServiceUnavailable(_) => "service_unavailable",
            AiblockError::Generation(_) => "generation_failure",
            AiblockError::Execution(_) | AiblockError::ExecutionTimeout(_) => "execution_failure",
            AiblockError::NoContext => "no_context",
        }
    }
}

/// Convenient Result type using AiblockError
pub type Result<T> = std::result::Result<T, AiblockError>;

/// Pipeline stage a failure belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Retrieval,
    Synthesis,
    Execution,
    Explanation,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Retrieval => "retrieval",
            Stage::Synthesis => "synthesis",
            Stage::Execution => "execution",
            Stage::Explanation => "explanation",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An error tagged with the pipeline stage that produced it
#[derive(Error, Debug)]
#[error("{stage} stage failed: {source}")]
pub struct PipelineError {
    pub stage: Stage,
    #[source]
    pub source: AiblockError,
}

impl PipelineError {
    pub fn new(stage: Stage, source: AiblockError) -> Self {
        Self { stage, source }
    }
}

/// Attach a stage to a fallible pipeline step
pub trait StageExt<T> {
    fn at_stage(self, stage: Stage) -> std::result::Result<T, PipelineError>;
}

impl<T> StageExt<T> for Result<T> {
    fn at_stage(self, stage: Stage) -> std::result::Result<T, PipelineError> {
        self.map_err(|e| PipelineError::new(stage, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = AiblockError::Config("Test error".to_string());
        assert!(err.to_string().contains("Configuration error"));
        assert!(err.to_string().contains("Test error"));
    }

    #[test]
    fn test_error_from_rusqlite() {
        let rusqlite_err = rusqlite::Error::InvalidQuery;
        let err: AiblockError = rusqlite_err.into();
        assert!(matches!(err, AiblockError::Database(_)));
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: AiblockError = io_err.into();
        assert!(matches!(err, AiblockError::Io(_)));
    }

    #[test]
    fn test_pipeline_error_carries_stage() {
        let result: Result<()> = Err(AiblockError::Execution("connection refused".to_string()));
        let err = result.at_stage(Stage::Execution).unwrap_err();
        assert_eq!(err.stage, Stage::Execution);
        assert!(err.to_string().starts_with("execution stage failed"));
        assert!(err.to_string().contains("connection refused"));
    }

    #[test]
    fn test_timeout_shares_execution_kind() {
        assert_eq!(AiblockError::ExecutionTimeout(30).kind(), "execution_failure");
        assert_eq!(AiblockError::Execution("x".into()).kind(), "execution_failure");
    }
}
