//! Chat agent: turns history and a user message into a model reply.
//!
//! Model failures never escape this type. They are logged and converted into
//! fixed fallback text so the caller always gets a displayable answer.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::agent::analysis::AnalysisType;
use crate::agent::prompt::{
    self, ANALYSIS_FALLBACK, DEFAULT_TITLE, EMPTY_REPLY, MODEL_FAILURE_REPLY,
};
use crate::config::AgentConfig;
use crate::conversation::{ConversationId, ConversationMessage, MessageId};
use crate::llm::ChatModel;

/// Reply produced for one user message.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentReply {
    /// Text shown to the user.
    pub content: String,
    /// Conversation the reply belongs to.
    pub conversation_id: ConversationId,
    /// Id the assistant message is stored under.
    pub message_id: MessageId,
}

/// Prompting front-end over a [`ChatModel`].
pub struct ChatAgent {
    model: Arc<dyn ChatModel>,
    config: AgentConfig,
}

impl ChatAgent {
    /// Wrap a model with prompting settings.
    #[must_use]
    pub const fn new(model: Arc<dyn ChatModel>, config: AgentConfig) -> Self {
        Self { model, config }
    }

    /// Answer `text` given the stored `history`.
    ///
    /// Only the last `history_window` messages are shown to the model.
    pub async fn process_message(
        &self,
        text: &str,
        conversation_id: &ConversationId,
        history: &[ConversationMessage],
    ) -> AgentReply {
        let start = history.len().saturating_sub(self.config.history_window);
        let messages = prompt::chat_messages(&history[start..], text);

        let content = match self.model.complete(messages, self.config.chat).await {
            Ok(reply) if reply.trim().is_empty() => EMPTY_REPLY.to_string(),
            Ok(reply) => reply,
            Err(err) => {
                warn!("Model call failed for {conversation_id}: {err}");
                MODEL_FAILURE_REPLY.to_string()
            }
        };

        AgentReply {
            content,
            conversation_id: conversation_id.clone(),
            message_id: MessageId::new(),
        }
    }

    /// Run one analysis over every message of a conversation.
    pub async fn analyze(&self, kind: AnalysisType, messages: &[ConversationMessage]) -> String {
        let prompt = prompt::analysis_messages(kind, messages);
        debug!("Analyzing {} messages ({kind})", messages.len());

        match self.model.complete(prompt, self.config.analysis).await {
            Ok(result) if !result.trim().is_empty() => result,
            Ok(_) => ANALYSIS_FALLBACK.to_string(),
            Err(err) => {
                warn!("Analysis ({kind}) failed: {err}");
                ANALYSIS_FALLBACK.to_string()
            }
        }
    }

    /// Short title for a conversation, based on its first user message.
    pub async fn generate_title(&self, messages: &[ConversationMessage]) -> String {
        if messages.is_empty() {
            return DEFAULT_TITLE.to_string();
        }
        let Some(first) = prompt::first_user_message(messages) else {
            return DEFAULT_TITLE.to_string();
        };

        match self
            .model
            .complete(prompt::title_messages(first), self.config.title)
            .await
        {
            Ok(raw) => prompt::clean_title(&raw).unwrap_or_else(|| prompt::fallback_title(first)),
            Err(err) => {
                warn!("Title generation failed: {err}");
                prompt::fallback_title(first)
            }
        }
    }
}
