//! Error types for bookrag.
//!
//! A single error enum covers every failure category. Grounding refusals are
//! not errors: they travel as a normal `Response`. Only malformed queries and
//! exhausted external dependencies surface here.

use thiserror::Error;

/// Unified error type for bookrag.
///
/// All fallible functions return `Result<T, AppError>`.
#[derive(Error, Debug)]
pub enum AppError {
    /// The query was rejected before any external call was made
    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    /// Embedding provider, vector index or chunk store exhausted its retries
    #[error("Retrieval unavailable: {0}")]
    RetrievalUnavailable(String),

    /// Language model provider exhausted its retries
    #[error("Generation unavailable: {0}")]
    GenerationUnavailable(String),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O and filesystem errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// LLM provider errors (single attempt)
    #[error("LLM error: {0}")]
    Llm(String),

    /// Chunk store, vector index and embedding errors (single attempt)
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

impl AppError {
    /// Whether this error means an external dependency is down.
    ///
    /// Callers show a generic "temporarily unavailable" message for these,
    /// never the refusal text used for ungrounded answers.
    pub fn is_unavailable(&self) -> bool {
        matches!(
            self,
            AppError::RetrievalUnavailable(_) | AppError::GenerationUnavailable(_)
        )
    }
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
    fn test_unavailable_classification() {
        assert!(AppError::RetrievalUnavailable("index down".to_string()).is_unavailable());
        assert!(AppError::GenerationUnavailable("llm down".to_string()).is_unavailable());
        assert!(!AppError::InvalidQuery("empty".to_string()).is_unavailable());
        assert!(!AppError::Llm("one failed attempt".to_string()).is_unavailable());
    }

    #[test]
    fn test_display_includes_category() {
        let err = AppError::InvalidQuery("query text is empty".to_string());
        assert_eq!(err.to_string(), "Invalid query: query text is empty");
    }
}
