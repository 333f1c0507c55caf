//! Process-local conversation store.

use std::sync::Arc;

use dashmap::DashMap;
use tracing::debug;

use crate::conversation::clock::{Clock, SystemClock};
use crate::conversation::errors::{ConversationError, ConversationResult};
use crate::conversation::ids::ConversationId;
use crate::conversation::store::{ConversationStore, StoreFuture};
use crate::conversation::types::{ConversationSession, MessageDraft, SessionPatch};

/// In-memory implementation of the conversation store.
///
/// Each operation runs under the owning shard lock, so single operations are
/// atomic. Contents are lost when the process exits.
pub struct MemoryConversationStore {
    sessions: DashMap<ConversationId, ConversationSession>,
    clock: Arc<dyn Clock>,
}

impl MemoryConversationStore {
    /// Create an empty store stamping records with `clock`.
    #[must_use]
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            sessions: DashMap::new(),
            clock,
        }
    }
}

impl Default for MemoryConversationStore {
    fn default() -> Self {
        Self::new(Arc::new(SystemClock))
    }
}

impl ConversationStore for MemoryConversationStore {
    fn get_or_create(
        &self,
        id: ConversationId,
    ) -> StoreFuture<'_, ConversationResult<ConversationSession>> {
        Box::pin(async move {
            let entry = self.sessions.entry(id.clone()).or_insert_with(|| {
                debug!("Creating conversation {}", id);
                ConversationSession::new(id, self.clock.now_ms())
            });
            Ok(entry.value().clone())
        })
    }

    fn append(
        &self,
        id: ConversationId,
        draft: MessageDraft,
    ) -> StoreFuture<'_, ConversationResult<ConversationSession>> {
        Box::pin(async move {
            let now = self.clock.now_ms();
            let mut entry = self
                .sessions
                .entry(id.clone())
                .or_insert_with(|| ConversationSession::new(id, now));
            entry.push_message(draft, now);
            Ok(entry.value().clone())
        })
    }

    fn patch(
        &self,
        id: ConversationId,
        patch: SessionPatch,
    ) -> StoreFuture<'_, ConversationResult<ConversationSession>> {
        Box::pin(async move {
            let now = self.clock.now_ms();
            let Some(mut entry) = self.sessions.get_mut(&id) else {
                return Err(ConversationError::NotFound(id.to_string()));
            };
            entry.apply_patch(patch, now);
            Ok(entry.value().clone())
        })
    }

    fn remove(&self, id: ConversationId) -> StoreFuture<'_, ConversationResult<()>> {
        Box::pin(async move {
            self.sessions.remove(&id);
            Ok(())
        })
    }

    fn list(&self) -> StoreFuture<'_, ConversationResult<Vec<ConversationSession>>> {
        Box::pin(async move {
            let mut sessions: Vec<ConversationSession> = self
                .sessions
                .iter()
                .map(|entry| entry.value().clone())
                .collect();
            sessions.sort_by(|a, b| b.updated_at.cmp(&a.updated_at).then_with(|| a.id.cmp(&b.id)));
            Ok(sessions)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conversation::clock::ManualClock;
    use crate::conversation::store::contract;

    fn fixture() -> (MemoryConversationStore, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(1_000));
        let store = MemoryConversationStore::new(clock.clone());
        (store, clock)
    }

    #[tokio::test]
    async fn appends_preserve_call_order() -> ConversationResult<()> {
        let (store, clock) = fixture();
        contract::appends_preserve_call_order(&store, &clock).await
    }

    #[tokio::test]
    async fn append_creates_missing_session() -> ConversationResult<()> {
        let (store, clock) = fixture();
        contract::append_creates_missing_session(&store, &clock).await
    }

    #[tokio::test]
    async fn get_or_create_is_idempotent() -> ConversationResult<()> {
        let (store, clock) = fixture();
        contract::get_or_create_is_idempotent(&store, &clock).await
    }

    #[tokio::test]
    async fn patch_requires_existing_session() -> ConversationResult<()> {
        let (store, clock) = fixture();
        contract::patch_requires_existing_session(&store, &clock).await
    }

    #[tokio::test]
    async fn patch_refreshes_updated_at_only() -> ConversationResult<()> {
        let (store, clock) = fixture();
        contract::patch_refreshes_updated_at_only(&store, &clock).await
    }

    #[tokio::test]
    async fn remove_then_recreate_starts_fresh() -> ConversationResult<()> {
        let (store, clock) = fixture();
        contract::remove_then_recreate_starts_fresh(&store, &clock).await
    }

    #[tokio::test]
    async fn list_orders_by_recency() -> ConversationResult<()> {
        let (store, clock) = fixture();
        contract::list_orders_by_recency(&store, &clock).await
    }

    #[tokio::test]
    async fn list_breaks_ties_by_id() -> ConversationResult<()> {
        let (store, _clock) = fixture();
        for name in ["zeta", "alpha", "mid"] {
            store.get_or_create(ConversationId::parse(name)?).await?;
        }
        let ids: Vec<String> = store
            .list()
            .await?
            .into_iter()
            .map(|s| s.id.to_string())
            .collect();
        assert_eq!(ids, vec!["alpha", "mid", "zeta"]);
        Ok(())
    }
}
