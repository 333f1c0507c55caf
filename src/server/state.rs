//! Application state shared across all request handlers.

use std::sync::Arc;
use std::time::Duration;

use tracing::info;

use crate::agent::{ChatAgent, ConversationRelay};
use crate::config::{RelayConfig, StoreBackend};
use crate::conversation::{
    Clock, ConversationLanes, ConversationStore, MemoryConversationStore, SqliteConversationStore,
    SystemClock,
};
use crate::llm::{ChatModel, OllamaChat};
use crate::workflow::{AnalysisWorkflow, ConversationWorkflow};

/// Shared application state.
pub struct AppState {
    /// Conversation store.
    pub store: Arc<dyn ConversationStore>,
    /// Per-conversation serialization.
    pub lanes: Arc<ConversationLanes>,
    /// Prompting front-end.
    pub agent: Arc<ChatAgent>,
    /// Direct chat path.
    pub relay: ConversationRelay,
    /// Chat turn as a workflow.
    pub chat_workflow: ConversationWorkflow,
    /// Analysis workflow.
    pub analysis_workflow: AnalysisWorkflow,
    /// Model name reported by `/health`.
    pub model_name: String,
}

impl AppState {
    /// Assemble state from injected capabilities.
    #[must_use]
    pub fn new(
        store: Arc<dyn ConversationStore>,
        model: Arc<dyn ChatModel>,
        clock: Arc<dyn Clock>,
        config: &RelayConfig,
    ) -> Arc<Self> {
        let lanes = Arc::new(ConversationLanes::new());
        let model_name = model.model_name().to_string();
        let agent = Arc::new(ChatAgent::new(model, config.agent.clone()));

        let relay = ConversationRelay::new(store.clone(), agent.clone(), lanes.clone());
        let chat_workflow = ConversationWorkflow::new(
            store.clone(),
            agent.clone(),
            lanes.clone(),
            clock.clone(),
            Duration::from_millis(config.workflow.response_delay_ms),
        );
        let analysis_workflow = AnalysisWorkflow::new(
            store.clone(),
            agent.clone(),
            clock,
            Duration::from_millis(config.workflow.analysis_delay_ms),
        );

        Arc::new(Self {
            store,
            lanes,
            agent,
            relay,
            chat_workflow,
            analysis_workflow,
            model_name,
        })
    }

    /// Build production state: configured store, Ollama model, system clock.
    ///
    /// # Errors
    /// Returns an error if the store cannot be opened or the model client cannot be built.
    pub async fn from_config(config: &RelayConfig) -> anyhow::Result<Arc<Self>> {
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);

        let store: Arc<dyn ConversationStore> = match config.storage.backend {
            StoreBackend::Sqlite => {
                Arc::new(SqliteConversationStore::open(&config.storage, clock.clone()).await?)
            }
            StoreBackend::Memory => {
                info!("Using in-memory conversation store");
                Arc::new(MemoryConversationStore::new(clock.clone()))
            }
        };

        let model = Arc::new(OllamaChat::new(&config.llm)?);
        info!("Model {} at {}", config.llm.model, model.endpoint());

        Ok(Self::new(store, model, clock, config))
    }
}
