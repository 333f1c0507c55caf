//! Error types for the conversation store.

use thiserror::Error;

/// Conversation subsystem error type.
#[derive(Debug, Error)]
pub enum ConversationError {
    /// A required field is missing or blank.
    #[error("validation error: {0}")]
    Validation(String),
    /// Patch targeted a conversation that has never been created.
    #[error("conversation not found: {0}")]
    NotFound(String),
    /// Backing storage could not be reached or returned inconsistent data.
    #[error("storage unavailable: {0}")]
    StorageUnavailable(String),
}

// Driver and encoding failures are storage failures for every caller.
impl From<tokio_rusqlite::Error> for ConversationError {
    fn from(err: tokio_rusqlite::Error) -> Self {
        Self::StorageUnavailable(format!("sqlite: {err}"))
    }
}

impl From<serde_json::Error> for ConversationError {
    fn from(err: serde_json::Error) -> Self {
        Self::StorageUnavailable(format!("encoding: {err}"))
    }
}

/// Convenience result alias for conversation operations.
pub type ConversationResult<T> = Result<T, ConversationError>;
