//! Language-model capability consumed by the agent.

use std::future::Future;
use std::pin::Pin;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::conversation::{ConversationMessage, MessageRole};

/// Boxed future type for model calls.
pub type LlmFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Role of a prompt message sent to the model.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    /// Instructions framing the exchange.
    System,
    /// User turn.
    User,
    /// Earlier model turn.
    Assistant,
}

impl From<MessageRole> for ChatRole {
    fn from(role: MessageRole) -> Self {
        match role {
            MessageRole::User => Self::User,
            MessageRole::Assistant => Self::Assistant,
        }
    }
}

/// One role-tagged message of a prompt.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct PromptMessage {
    /// Message role.
    pub role: ChatRole,
    /// Message text.
    pub content: String,
}

impl PromptMessage {
    /// System message.
    #[must_use]
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::System,
            content: content.into(),
        }
    }

    /// User message.
    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }
}

impl From<&ConversationMessage> for PromptMessage {
    fn from(message: &ConversationMessage) -> Self {
        Self {
            role: message.role.into(),
            content: message.content.clone(),
        }
    }
}

/// Generation limits for one call.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct CompletionOptions {
    /// Maximum number of tokens to generate.
    pub max_tokens: u32,
    /// Sampling temperature.
    pub temperature: f32,
}

impl CompletionOptions {
    /// Build options from a token budget and temperature.
    #[must_use]
    pub const fn new(max_tokens: u32, temperature: f32) -> Self {
        Self {
            max_tokens,
            temperature,
        }
    }
}

/// Errors produced by model calls.
#[derive(Debug, Error)]
pub enum LlmError {
    /// Transport failure, including timeouts.
    #[error("http client error: {0}")]
    Http(#[from] reqwest::Error),
    /// The model endpoint answered with a non-success status.
    #[error("model http status not ok: {0}")]
    HttpStatus(u16),
    /// The response did not contain a message.
    #[error("model response malformed")]
    MalformedResponse,
    /// Client configuration is unusable.
    #[error("invalid model configuration: {0}")]
    InvalidConfig(String),
    /// URL parse error.
    #[error("url parse error: {0}")]
    Url(#[from] url::ParseError),
    /// Model could not serve the request for another reason.
    #[error("model unavailable: {0}")]
    Unavailable(String),
}

/// Convenience result alias for model calls.
pub type LlmResult<T> = Result<T, LlmError>;

/// Hosted language model accepting a role-tagged message list.
pub trait ChatModel: Send + Sync {
    /// Generate a reply for `messages`.
    ///
    /// # Errors
    /// Returns an error if the model cannot be reached or answers badly.
    fn complete(
        &self,
        messages: Vec<PromptMessage>,
        options: CompletionOptions,
    ) -> LlmFuture<'_, LlmResult<String>>;

    /// Name of the model serving requests.
    fn model_name(&self) -> &str;
}
