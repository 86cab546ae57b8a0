//! ============================================================================
//! Error Types
//! ============================================================================
//! Collaborator failures are absorbed inside the pipeline and never reach the
//! caller; only the errors below are returned from the public operations.
//! ============================================================================

use std::time::Duration;

use thiserror::Error;

/// Errors returned by `Assistant` operations
#[derive(Debug, Error)]
pub enum AssistantError {
    /// The owner id is missing or malformed; the operation is rejected
    #[error("Invalid owner id: {0}")]
    InvalidOwner(String),

    /// Storage failure in an operation that cannot fall back (indexing, stats)
    #[error("Storage error: {0}")]
    Storage(#[from] anyhow::Error),
}

/// Typed failures from a response generator
#[derive(Debug, Clone, Error, PartialEq)]
pub enum GenerationError {
    #[error("Generator unavailable: {0}")]
    Unavailable(String),

    #[error("Generation timed out after {}s", .0.as_secs())]
    Timeout(Duration),

    #[error("Model not found: {0}")]
    ModelNotFound(String),

    #[error("Malformed generator response: {0}")]
    MalformedResponse(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = GenerationError::Timeout(Duration::from_secs(420));
        assert_eq!(err.to_string(), "Generation timed out after 420s");

        let err = AssistantError::InvalidOwner("owner id is empty".to_string());
        assert_eq!(err.to_string(), "Invalid owner id: owner id is empty");
    }
}
