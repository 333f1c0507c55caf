//! Runtime configuration for the relay.
//!
//! Resolved once at startup from `RELAY_*` environment variables; every
//! section has sensible defaults so an empty environment runs a local setup.

use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

use crate::llm::CompletionOptions;

/// Errors produced while resolving configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A value is out of range or cannot be parsed.
    #[error("invalid configuration: {0}")]
    Invalid(String),
    /// URL parse error.
    #[error("url parse error: {0}")]
    Url(#[from] url::ParseError),
}

/// Convenience result alias for configuration.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Top-level configuration.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct RelayConfig {
    /// HTTP listener settings.
    pub server: ServerConfig,
    /// Conversation storage settings.
    pub storage: StorageConfig,
    /// Model endpoint settings.
    pub llm: LlmConfig,
    /// Prompting settings.
    pub agent: AgentConfig,
    /// Workflow pacing.
    pub workflow: WorkflowConfig,
}

impl RelayConfig {
    /// Resolve configuration from the process environment.
    ///
    /// # Errors
    /// Returns an error if a variable is set to an invalid value.
    pub fn from_env() -> ConfigResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Resolve configuration from an arbitrary key lookup.
    ///
    /// # Errors
    /// Returns an error if a value cannot be parsed or fails validation.
    pub fn from_lookup<F>(lookup: F) -> ConfigResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(port) = parse_var(&lookup, "RELAY_PORT")? {
            config.server.port = port;
        }
        if let Some(backend) = parse_var(&lookup, "RELAY_STORE")? {
            config.storage.backend = backend;
        }
        if let Some(path) = non_empty(&lookup, "RELAY_SQLITE_PATH") {
            config.storage.sqlite_path = PathBuf::from(path);
        }
        if let Some(url) = non_empty(&lookup, "RELAY_OLLAMA_URL") {
            config.llm.base_url = url;
        }
        if let Some(model) = non_empty(&lookup, "RELAY_MODEL") {
            config.llm.model = model;
        }
        if let Some(keep_alive) = non_empty(&lookup, "RELAY_KEEP_ALIVE") {
            config.llm.keep_alive = keep_alive;
        }
        if let Some(timeout) = parse_var(&lookup, "RELAY_LLM_TIMEOUT_SECS")? {
            config.llm.request_timeout_secs = timeout;
        }
        if let Some(window) = parse_var(&lookup, "RELAY_HISTORY_WINDOW")? {
            config.agent.history_window = window;
        }
        if let Some(delay) = parse_var(&lookup, "RELAY_RESPONSE_DELAY_MS")? {
            config.workflow.response_delay_ms = delay;
        }
        if let Some(delay) = parse_var(&lookup, "RELAY_ANALYSIS_DELAY_MS")? {
            config.workflow.analysis_delay_ms = delay;
        }

        config.validate()?;
        Ok(config)
    }

    /// Validate configuration invariants.
    ///
    /// # Errors
    /// Returns an error if any values are out of range or invalid.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.server.port == 0 {
            return Err(ConfigError::Invalid("server.port must be > 0".to_string()));
        }

        if !is_identifier(&self.storage.table) {
            return Err(ConfigError::Invalid(format!(
                "storage.table must be a plain identifier, got {:?}",
                self.storage.table
            )));
        }

        if self.llm.model.trim().is_empty() {
            return Err(ConfigError::Invalid("llm.model must not be empty".to_string()));
        }

        if self.llm.connect_timeout_secs == 0 || self.llm.request_timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "llm timeouts must be > 0".to_string(),
            ));
        }

        if self.agent.history_window == 0 {
            return Err(ConfigError::Invalid(
                "agent.history_window must be > 0".to_string(),
            ));
        }

        Url::parse(&self.llm.base_url)?;

        Ok(())
    }
}

fn non_empty<F>(lookup: &F, key: &str) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn parse_var<F, T>(lookup: &F, key: &str) -> ConfigResult<Option<T>>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    non_empty(lookup, key)
        .map(|raw| {
            raw.parse::<T>()
                .map_err(|_| ConfigError::Invalid(format!("{key} has invalid value {raw:?}")))
        })
        .transpose()
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    chars
        .next()
        .is_some_and(|first| first.is_ascii_alphabetic() || first == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// HTTP listener settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Port bound on all interfaces.
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { port: 3000 }
    }
}

/// Which conversation store backs the service.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    /// Durable `SQLite` file.
    #[default]
    Sqlite,
    /// Process-local map, lost on exit.
    Memory,
}

impl FromStr for StoreBackend {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_ascii_lowercase().as_str() {
            "sqlite" => Ok(Self::Sqlite),
            "memory" => Ok(Self::Memory),
            other => Err(ConfigError::Invalid(format!("unknown store backend {other}"))),
        }
    }
}

/// Conversation storage settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Backend selector.
    pub backend: StoreBackend,
    /// `SQLite` database path.
    pub sqlite_path: PathBuf,
    /// Table holding one row per conversation.
    pub table: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::Sqlite,
            sqlite_path: PathBuf::from("conversations.sqlite"),
            table: "conversations".to_string(),
        }
    }
}

/// Model endpoint settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Ollama base URL.
    pub base_url: String,
    /// Model name.
    pub model: String,
    /// How long Ollama keeps the model loaded between calls.
    pub keep_alive: String,
    /// Connection timeout in seconds.
    pub connect_timeout_secs: u64,
    /// Whole-request timeout in seconds.
    pub request_timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:11434".to_string(),
            model: "llama3.1:8b-instruct-q8_0".to_string(),
            keep_alive: "5m".to_string(),
            connect_timeout_secs: 5,
            request_timeout_secs: 120,
        }
    }
}

/// Prompting settings for the chat agent.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Number of stored messages shown to the model.
    pub history_window: usize,
    /// Limits for chat replies.
    pub chat: CompletionOptions,
    /// Limits for conversation analysis.
    pub analysis: CompletionOptions,
    /// Limits for title generation.
    pub title: CompletionOptions,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            history_window: 10,
            chat: CompletionOptions::new(1000, 0.7),
            analysis: CompletionOptions::new(500, 0.3),
            title: CompletionOptions::new(20, 0.3),
        }
    }
}

/// Pacing delays of the workflows.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct WorkflowConfig {
    /// Sleep after a chat workflow stores the reply.
    pub response_delay_ms: u64,
    /// Sleep after an analysis completes.
    pub analysis_delay_ms: u64,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            response_delay_ms: 100,
            analysis_delay_ms: 200,
        }
    }
}
