//! Ollama chat client.
//!
//! Sends the whole prompt as a message list to `POST /api/chat` with
//! streaming disabled and returns the assistant text.

use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;
use url::Url;

use crate::config::LlmConfig;
use crate::llm::chat_model::{
    ChatModel, CompletionOptions, LlmError, LlmFuture, LlmResult, PromptMessage,
};

#[derive(Serialize)]
struct ChatOptions {
    temperature: f32,
    num_predict: u32,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [PromptMessage],
    stream: bool,
    keep_alive: &'a str,
    options: ChatOptions,
}

#[derive(Deserialize)]
struct ChatResponse {
    message: Option<ChatResponseMessage>,
}

#[derive(Deserialize)]
struct ChatResponseMessage {
    content: String,
}

/// Async Ollama client implementing [`ChatModel`].
pub struct OllamaChat {
    client: Client,
    endpoint: Url,
    model: String,
    keep_alive: String,
}

impl OllamaChat {
    /// Build a client from configuration.
    ///
    /// # Errors
    /// Returns an error if the base URL is invalid or the HTTP client cannot be built.
    pub fn new(config: &LlmConfig) -> LlmResult<Self> {
        if config.model.trim().is_empty() {
            return Err(LlmError::InvalidConfig("model name is empty".to_string()));
        }

        let client = Client::builder()
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;

        Ok(Self {
            client,
            endpoint: chat_endpoint(&config.base_url)?,
            model: config.model.clone(),
            keep_alive: config.keep_alive.clone(),
        })
    }

    /// Endpoint requests are posted to.
    #[must_use]
    pub const fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

impl ChatModel for OllamaChat {
    fn complete(
        &self,
        messages: Vec<PromptMessage>,
        options: CompletionOptions,
    ) -> LlmFuture<'_, LlmResult<String>> {
        Box::pin(async move {
            let request = ChatRequest {
                model: &self.model,
                messages: &messages,
                stream: false,
                keep_alive: &self.keep_alive,
                options: ChatOptions {
                    temperature: options.temperature,
                    num_predict: options.max_tokens,
                },
            };

            debug!(
                "Sending {} messages to {} (num_predict={})",
                messages.len(),
                self.model,
                options.max_tokens
            );

            let response = self
                .client
                .post(self.endpoint.clone())
                .json(&request)
                .send()
                .await?;
            let status = response.status();
            if !status.is_success() {
                return Err(LlmError::HttpStatus(status.as_u16()));
            }

            let body = response.json::<ChatResponse>().await?;
            extract_content(body)
        })
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

fn chat_endpoint(base_url: &str) -> LlmResult<Url> {
    let base = base_url.trim_end_matches('/');
    Ok(Url::parse(&format!("{base}/api/chat"))?)
}

fn extract_content(body: ChatResponse) -> LlmResult<String> {
    body.message
        .map(|message| message.content)
        .ok_or(LlmError::MalformedResponse)
}
