//! Scripted model double for tests.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use crate::llm::chat_model::{
    ChatModel, CompletionOptions, LlmError, LlmFuture, LlmResult, PromptMessage,
};

/// One recorded model call.
#[derive(Clone, Debug)]
pub(crate) struct RecordedCall {
    pub(crate) messages: Vec<PromptMessage>,
    pub(crate) options: CompletionOptions,
}

/// Replies from a queue, then falls back to a fixed reply.
pub(crate) struct ScriptedModel {
    replies: Mutex<VecDeque<LlmResult<String>>>,
    fallback: Option<String>,
    calls: Mutex<Vec<RecordedCall>>,
    delay: Option<Duration>,
}

impl ScriptedModel {
    /// Always answers `reply`.
    pub(crate) fn replying(reply: &str) -> Self {
        Self {
            replies: Mutex::new(VecDeque::new()),
            fallback: Some(reply.to_string()),
            calls: Mutex::new(Vec::new()),
            delay: None,
        }
    }

    /// Always fails.
    pub(crate) fn failing() -> Self {
        Self {
            replies: Mutex::new(VecDeque::new()),
            fallback: None,
            calls: Mutex::new(Vec::new()),
            delay: None,
        }
    }

    /// Answers `replies` in order, then fails.
    pub(crate) fn sequence(replies: Vec<LlmResult<String>>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            fallback: None,
            calls: Mutex::new(Vec::new()),
            delay: None,
        }
    }

    /// Wait `delay` before every answer.
    pub(crate) const fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub(crate) fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().map(|calls| calls.clone()).unwrap_or_default()
    }
}

impl ChatModel for ScriptedModel {
    fn complete(
        &self,
        messages: Vec<PromptMessage>,
        options: CompletionOptions,
    ) -> LlmFuture<'_, LlmResult<String>> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(RecordedCall { messages, options });
        }
        let next = self
            .replies
            .lock()
            .ok()
            .and_then(|mut replies| replies.pop_front());
        let reply = next.unwrap_or_else(|| {
            self.fallback
                .clone()
                .ok_or_else(|| LlmError::Unavailable("scripted failure".to_string()))
        });
        let delay = self.delay;
        Box::pin(async move {
            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }
            reply
        })
    }

    fn model_name(&self) -> &str {
        "scripted"
    }
}
