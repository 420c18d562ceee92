//! Domain errors for the homework tracker.

use thiserror::Error;

/// Domain-level errors that can occur in the homework tracker.
///
/// Only the first three variants are ever shown to API callers; storage and
/// serialization failures are logged and reported as internal errors.
#[derive(Debug, Error)]
pub enum DomainError {
    #[error("{0}")]
    ValidationFailed(String),

    #[error("Student not found: {0}")]
    StudentNotFound(String),

    #[error("{0} exists")]
    Conflict(&'static str),

    #[error("Storage error: {0}")]
    StorageError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

pub type DomainResult<T> = Result<T, DomainError>;

impl DomainError {
    /// Shorthand for a validation failure with a static message.
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::ValidationFailed(message.into())
    }
}

impl From<std::io::Error> for DomainError {
    fn from(err: std::io::Error) -> Self {
        DomainError::StorageError(err.to_string())
    }
}

impl From<serde_json::Error> for DomainError {
    fn from(err: serde_json::Error) -> Self {
        DomainError::SerializationError(err.to_string())
    }
}
