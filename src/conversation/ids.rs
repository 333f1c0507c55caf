//! Identifier types for conversations and messages.
//!
//! Conversation ids are supplied by callers and stay stable for the lifetime
//! of a conversation; the store never generates them. Message ids are opaque
//! strings, generated here when a caller does not provide one.

use core::fmt;
use core::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::conversation::errors::{ConversationError, ConversationResult};

/// Caller-supplied identifier naming one chat history.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConversationId(String);

impl ConversationId {
    /// Validate and wrap a raw conversation id.
    ///
    /// # Errors
    /// Returns a validation error if the id is empty or only whitespace.
    pub fn parse(raw: impl Into<String>) -> ConversationResult<Self> {
        let raw = raw.into();
        if raw.trim().is_empty() {
            return Err(ConversationError::Validation(
                "Missing conversation ID".to_string(),
            ));
        }
        Ok(Self(raw))
    }

    /// Borrow the id as a string slice.
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ConversationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for ConversationId {
    type Err = ConversationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl AsRef<str> for ConversationId {
    #[inline]
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Opaque message identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageId(String);

impl Default for MessageId {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

impl MessageId {
    /// Generate a fresh random identifier (UUID v4).
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Wrap an identifier supplied by a caller, unchanged.
    #[inline]
    #[must_use]
    pub fn from_raw(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// True when the caller sent an empty id, which counts as no id at all.
    #[inline]
    #[must_use]
    pub fn is_blank(&self) -> bool {
        self.0.is_empty()
    }

    /// Borrow the id as a string slice.
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
