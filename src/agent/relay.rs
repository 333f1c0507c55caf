//! Conversation relay: the ordered read, model, append, append sequence.

use std::sync::Arc;

use tracing::{debug, info};

use crate::agent::chat_agent::{AgentReply, ChatAgent};
use crate::conversation::{
    ConversationError, ConversationId, ConversationLanes, ConversationResult, ConversationStore,
    MessageDraft,
};

/// Relays user messages to the agent and records both turns.
pub struct ConversationRelay {
    store: Arc<dyn ConversationStore>,
    agent: Arc<ChatAgent>,
    lanes: Arc<ConversationLanes>,
}

impl ConversationRelay {
    /// Build a relay over shared capabilities.
    #[must_use]
    pub const fn new(
        store: Arc<dyn ConversationStore>,
        agent: Arc<ChatAgent>,
        lanes: Arc<ConversationLanes>,
    ) -> Self {
        Self {
            store,
            agent,
            lanes,
        }
    }

    /// Answer `user_text` in conversation `conversation_id`.
    ///
    /// The user message and the reply are two separate appends. If the second
    /// one fails, the user message stays stored without a reply.
    ///
    /// # Errors
    /// Returns a validation error for blank text, or a storage error.
    pub async fn relay(
        &self,
        conversation_id: ConversationId,
        user_text: &str,
    ) -> ConversationResult<AgentReply> {
        if user_text.trim().is_empty() {
            return Err(ConversationError::Validation(
                "Missing message".to_string(),
            ));
        }

        let _lane = self.lanes.acquire(&conversation_id).await;

        let session = self.store.get_or_create(conversation_id.clone()).await?;
        debug!(
            "Relaying message for {conversation_id} ({} stored)",
            session.messages.len()
        );

        let reply = self
            .agent
            .process_message(user_text, &conversation_id, &session.messages)
            .await;

        self.store
            .append(conversation_id.clone(), MessageDraft::user(user_text))
            .await?;
        self.store
            .append(
                conversation_id.clone(),
                MessageDraft::assistant(reply.content.clone()).with_id(reply.message_id.clone()),
            )
            .await?;

        info!("Conversation {conversation_id} answered ({})", reply.message_id);
        Ok(reply)
    }
}
