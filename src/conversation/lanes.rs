//! Per-conversation serialization.
//!
//! Multi-step sequences (get, model call, append, append) must not interleave
//! for one conversation. Each conversation id gets its own async mutex; ids
//! never contend with each other.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::conversation::ids::ConversationId;

/// Registry of per-conversation locks.
#[derive(Debug, Default)]
pub struct ConversationLanes {
    lanes: DashMap<ConversationId, Arc<Mutex<()>>>,
}

impl ConversationLanes {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to `id`.
    pub async fn acquire(&self, id: &ConversationId) -> LaneGuard<'_> {
        let lane = {
            let entry = self
                .lanes
                .entry(id.clone())
                .or_insert_with(|| Arc::new(Mutex::new(())));
            Arc::clone(entry.value())
        };
        let guard = lane.lock_owned().await;
        LaneGuard {
            lanes: self,
            id: id.clone(),
            guard: Some(guard),
        }
    }

    /// Number of lanes currently tracked.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lanes.len()
    }

    /// True when no conversation is held or awaited.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lanes.is_empty()
    }
}

/// Exclusive access to one conversation; released on drop.
#[derive(Debug)]
pub struct LaneGuard<'a> {
    lanes: &'a ConversationLanes,
    id: ConversationId,
    guard: Option<OwnedMutexGuard<()>>,
}

impl LaneGuard<'_> {
    /// Conversation this guard serializes.
    #[must_use]
    pub const fn conversation_id(&self) -> &ConversationId {
        &self.id
    }
}

impl Drop for LaneGuard<'_> {
    fn drop(&mut self) {
        drop(self.guard.take());
        // Only the map still references an idle lane.
        self.lanes
            .lanes
            .remove_if(&self.id, |_, lane| Arc::strong_count(lane) == 1);
    }
}
