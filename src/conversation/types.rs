//! Conversation session model and its mutation rules.
//!
//! Every change to a session goes through [`ConversationSession::push_message`]
//! or [`ConversationSession::apply_patch`], so both store backends share the
//! same ordering and timestamp rules.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::conversation::ids::{ConversationId, MessageId};

/// Author of a stored message.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    /// Message typed by the user.
    User,
    /// Reply produced by the model.
    Assistant,
}

impl MessageRole {
    /// Stable string form for storage and prompts.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

impl fmt::Display for MessageRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A message as persisted in a session.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct ConversationMessage {
    /// Opaque unique identifier.
    pub id: MessageId,
    /// Author of the message.
    pub role: MessageRole,
    /// Text payload.
    pub content: String,
    /// Store-assigned append time in milliseconds since epoch.
    pub timestamp: i64,
}

/// A message submitted for append; the store fills in the rest.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct MessageDraft {
    /// Optional caller-chosen id; a fresh one is generated when absent or blank.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<MessageId>,
    /// Author of the message.
    pub role: MessageRole,
    /// Text payload.
    pub content: String,
}

impl MessageDraft {
    /// Draft a user message without an id.
    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            id: None,
            role: MessageRole::User,
            content: content.into(),
        }
    }

    /// Draft an assistant message without an id.
    #[must_use]
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            id: None,
            role: MessageRole::Assistant,
            content: content.into(),
        }
    }

    /// Pin the id the store should use.
    #[must_use]
    pub fn with_id(mut self, id: MessageId) -> Self {
        self.id = Some(id);
        self
    }
}

/// Partial update accepted by `patch`.
///
/// Unknown fields in the incoming JSON (`id`, `messages`, `createdAt`, ...)
/// are ignored; a patch cannot rewrite history or identity.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionPatch {
    /// New display title.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Metadata keys to merge; a `null` value removes the key.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Map<String, Value>>,
}

impl SessionPatch {
    /// Patch that only sets the title.
    #[must_use]
    pub fn title(title: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            metadata: None,
        }
    }
}

/// The persisted record for one conversation id.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationSession {
    /// Conversation identifier.
    pub id: ConversationId,
    /// Messages in append order.
    pub messages: Vec<ConversationMessage>,
    /// Creation time, set once.
    pub created_at: i64,
    /// Time of the last append or patch.
    pub updated_at: i64,
    /// Optional display title.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Free-form metadata merged in by patches.
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub metadata: Map<String, Value>,
}

impl ConversationSession {
    /// Create an empty session born at `now_ms`.
    #[must_use]
    pub fn new(id: ConversationId, now_ms: i64) -> Self {
        Self {
            id,
            messages: Vec::new(),
            created_at: now_ms,
            updated_at: now_ms,
            title: None,
            metadata: Map::new(),
        }
    }

    /// Append a draft at the end of the history and return the stored message.
    ///
    /// The timestamp never goes below `updated_at`, which keeps message
    /// timestamps non-decreasing even if the clock steps backwards.
    pub fn push_message(&mut self, draft: MessageDraft, now_ms: i64) -> &ConversationMessage {
        let timestamp = now_ms.max(self.updated_at);
        let id = draft
            .id
            .filter(|id| !id.is_blank())
            .unwrap_or_default();

        self.updated_at = timestamp;
        self.messages.push(ConversationMessage {
            id,
            role: draft.role,
            content: draft.content,
            timestamp,
        });
        &self.messages[self.messages.len() - 1]
    }

    /// Merge a patch into the session and refresh `updated_at`.
    pub fn apply_patch(&mut self, patch: SessionPatch, now_ms: i64) {
        if let Some(title) = patch.title {
            self.title = Some(title);
        }
        if let Some(metadata) = patch.metadata {
            for (key, value) in metadata {
                if value.is_null() {
                    self.metadata.remove(&key);
                } else {
                    self.metadata.insert(key, value);
                }
            }
        }
        self.updated_at = now_ms.max(self.updated_at);
    }

    /// Find a message by id.
    #[must_use]
    pub fn message(&self, id: &MessageId) -> Option<&ConversationMessage> {
        self.messages.iter().rev().find(|message| &message.id == id)
    }

    /// The most recent `window` messages, oldest first.
    #[must_use]
    pub fn recent(&self, window: usize) -> &[ConversationMessage] {
        let start = self.messages.len().saturating_sub(window);
        &self.messages[start..]
    }
}
