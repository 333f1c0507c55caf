//! Language-model access: the `ChatModel` capability and its Ollama client.

pub mod chat_model;
pub mod ollama;
#[cfg(test)]
pub(crate) mod testing;

pub use chat_model::{
    ChatModel, ChatRole, CompletionOptions, LlmError, LlmFuture, LlmResult, PromptMessage,
};
pub use ollama::OllamaChat;
