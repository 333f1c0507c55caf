//! Conversation store abstraction.

use std::future::Future;
use std::pin::Pin;

use crate::conversation::errors::ConversationResult;
use crate::conversation::ids::ConversationId;
use crate::conversation::types::{ConversationSession, MessageDraft, SessionPatch};

/// Boxed future type for conversation store operations.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Durable per-conversation session store.
///
/// Each operation is atomic for the record it touches. Sequences of
/// operations on one conversation must be serialized by the caller, see
/// [`ConversationLanes`](crate::conversation::ConversationLanes).
pub trait ConversationStore: Send + Sync {
    /// Load a session, creating and persisting an empty one if absent.
    ///
    /// # Errors
    /// Returns an error if storage access fails.
    fn get_or_create(
        &self,
        id: ConversationId,
    ) -> StoreFuture<'_, ConversationResult<ConversationSession>>;

    /// Append one message to the end of a session, creating the session if needed.
    ///
    /// # Errors
    /// Returns an error if storage access fails.
    fn append(
        &self,
        id: ConversationId,
        draft: MessageDraft,
    ) -> StoreFuture<'_, ConversationResult<ConversationSession>>;

    /// Merge a patch into an existing session.
    ///
    /// # Errors
    /// Returns `NotFound` if the session does not exist, or a storage error.
    fn patch(
        &self,
        id: ConversationId,
        patch: SessionPatch,
    ) -> StoreFuture<'_, ConversationResult<ConversationSession>>;

    /// Delete a session. Deleting an unknown id succeeds.
    ///
    /// # Errors
    /// Returns an error if storage access fails.
    fn remove(&self, id: ConversationId) -> StoreFuture<'_, ConversationResult<()>>;

    /// All sessions, most recently updated first.
    ///
    /// # Errors
    /// Returns an error if storage access fails.
    fn list(&self) -> StoreFuture<'_, ConversationResult<Vec<ConversationSession>>>;
}
