//! Chat turn as a durable step pipeline.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::agent::{AgentReply, ChatAgent};
use crate::conversation::{
    Clock, ConversationError, ConversationId, ConversationLanes, ConversationMessage,
    ConversationResult, ConversationSession, ConversationStore, MessageDraft, MessageId,
    MessageRole,
};
use crate::workflow::step::{StepRecord, WorkflowRun};

/// Input of a chat workflow.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationWorkflowParams {
    /// Target conversation.
    pub conversation_id: ConversationId,
    /// Text typed by the user.
    pub user_message: String,
}

/// Result of a completed chat workflow.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationWorkflowOutput {
    /// Always true for a completed run.
    pub success: bool,
    /// Run identifier.
    pub workflow_id: String,
    /// Target conversation.
    pub conversation_id: ConversationId,
    /// Stored user message.
    pub user_message: ConversationMessage,
    /// Stored assistant message.
    pub assistant_message: ConversationMessage,
    /// Session after both appends.
    pub conversation_state: ConversationSession,
    /// Steps of this attempt.
    pub steps: Vec<StepRecord>,
}

/// Chat workflow over shared capabilities.
pub struct ConversationWorkflow {
    store: Arc<dyn ConversationStore>,
    agent: Arc<ChatAgent>,
    lanes: Arc<ConversationLanes>,
    clock: Arc<dyn Clock>,
    response_delay: Duration,
}

impl ConversationWorkflow {
    /// Build the workflow.
    #[must_use]
    pub const fn new(
        store: Arc<dyn ConversationStore>,
        agent: Arc<ChatAgent>,
        lanes: Arc<ConversationLanes>,
        clock: Arc<dyn Clock>,
        response_delay: Duration,
    ) -> Self {
        Self {
            store,
            agent,
            lanes,
            clock,
            response_delay,
        }
    }

    /// Start a fresh run named `chat_{conversationId}_{ms}`.
    ///
    /// # Errors
    /// Returns a validation error for a blank message, or a storage error.
    pub async fn start(
        &self,
        params: &ConversationWorkflowParams,
    ) -> ConversationResult<ConversationWorkflowOutput> {
        let mut run = WorkflowRun::new(format!(
            "chat_{}_{}",
            params.conversation_id,
            self.clock.now_ms()
        ));
        self.run(&mut run, params).await
    }

    /// Execute (or resume) `run`.
    ///
    /// # Errors
    /// Returns a validation error for a blank message, or a storage error.
    pub async fn run(
        &self,
        run: &mut WorkflowRun,
        params: &ConversationWorkflowParams,
    ) -> ConversationResult<ConversationWorkflowOutput> {
        if params.user_message.trim().is_empty() {
            return Err(ConversationError::Validation(
                "Missing message".to_string(),
            ));
        }
        let id = &params.conversation_id;
        let _lane = self.lanes.acquire(id).await;
        run.begin_attempt();

        let history: Vec<ConversationMessage> = run
            .step("load-history", || async move {
                self.store
                    .get_or_create(id.clone())
                    .await
                    .map(|session| session.messages)
            })
            .await?;

        let user_message: ConversationMessage = run
            .step("create-user-message", || {
                let message = ConversationMessage {
                    id: MessageId::new(),
                    role: MessageRole::User,
                    content: params.user_message.clone(),
                    timestamp: self.clock.now_ms(),
                };
                async move { Ok::<_, ConversationError>(message) }
            })
            .await?;

        let _: ConversationSession = run
            .step("store-user-message", || {
                let draft = draft_of(&user_message);
                async move { self.store.append(id.clone(), draft).await }
            })
            .await?;

        let history = history.as_slice();
        let reply: AgentReply = run
            .step("process-ai-response", || async move {
                Ok::<_, ConversationError>(
                    self.agent
                        .process_message(&params.user_message, id, history)
                        .await,
                )
            })
            .await?;

        let assistant_message: ConversationMessage = run
            .step("create-assistant-message", || {
                let message = ConversationMessage {
                    id: reply.message_id.clone(),
                    role: MessageRole::Assistant,
                    content: reply.content.clone(),
                    timestamp: self.clock.now_ms(),
                };
                async move { Ok::<_, ConversationError>(message) }
            })
            .await?;

        let final_state: ConversationSession = run
            .step("store-assistant-message", || {
                let draft = draft_of(&assistant_message);
                async move { self.store.append(id.clone(), draft).await }
            })
            .await?;

        run.sleep("response-delay", self.response_delay).await;
        info!("Workflow {} finished for {id}", run.id());

        Ok(ConversationWorkflowOutput {
            success: true,
            workflow_id: run.id().to_string(),
            conversation_id: id.clone(),
            user_message: stored(&final_state, user_message),
            assistant_message: stored(&final_state, assistant_message),
            conversation_state: final_state,
            steps: run.steps().to_vec(),
        })
    }
}

fn draft_of(message: &ConversationMessage) -> MessageDraft {
    MessageDraft {
        id: Some(message.id.clone()),
        role: message.role,
        content: message.content.clone(),
    }
}

// The store stamps its own timestamp; report the persisted copy.
fn stored(session: &ConversationSession, created: ConversationMessage) -> ConversationMessage {
    session.message(&created.id).cloned().unwrap_or(created)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AgentConfig;
    use crate::conversation::{ManualClock, MemoryConversationStore};
    use crate::llm::testing::ScriptedModel;
    use crate::workflow::step::StepStatus;

    struct Fixture {
        store: Arc<MemoryConversationStore>,
        model: Arc<ScriptedModel>,
        workflow: ConversationWorkflow,
    }

    fn fixture(model: ScriptedModel) -> Fixture {
        let clock = Arc::new(ManualClock::new(5_000));
        let store = Arc::new(MemoryConversationStore::new(clock.clone()));
        let model = Arc::new(model);
        let agent = Arc::new(ChatAgent::new(model.clone(), AgentConfig::default()));
        let workflow = ConversationWorkflow::new(
            store.clone(),
            agent,
            Arc::new(ConversationLanes::new()),
            clock,
            Duration::ZERO,
        );
        Fixture {
            store,
            model,
            workflow,
        }
    }

    fn params(id: &str, text: &str) -> ConversationResult<ConversationWorkflowParams> {
        Ok(ConversationWorkflowParams {
            conversation_id: ConversationId::parse(id)?,
            user_message: text.to_string(),
        })
    }

    #[tokio::test]
    async fn runs_every_step_in_order() -> ConversationResult<()> {
        let fx = fixture(ScriptedModel::replying("pong"));
        let output = fx.workflow.start(&params("c1", "ping")?).await?;

        assert!(output.success);
        assert_eq!(output.workflow_id, "chat_c1_5000");
        assert_eq!(output.user_message.content, "ping");
        assert_eq!(output.assistant_message.content, "pong");
        assert_eq!(output.conversation_state.messages.len(), 2);
        assert_eq!(
            output.conversation_state.messages[1].id,
            output.assistant_message.id
        );

        let names: Vec<&str> = output.steps.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "load-history",
                "create-user-message",
                "store-user-message",
                "process-ai-response",
                "create-assistant-message",
                "store-assistant-message",
                "response-delay",
            ]
        );
        Ok(())
    }

    #[tokio::test]
    async fn replaying_a_finished_run_appends_nothing() -> ConversationResult<()> {
        let fx = fixture(ScriptedModel::replying("pong"));
        let params = params("c1", "ping")?;
        let mut run = WorkflowRun::new("chat_c1_test");

        let first = fx.workflow.run(&mut run, &params).await?;
        let second = fx.workflow.run(&mut run, &params).await?;

        assert_eq!(first.assistant_message, second.assistant_message);
        assert!(second.steps.iter().all(|s| s.status == StepStatus::Replayed));
        assert_eq!(fx.model.calls().len(), 1);

        let session = fx.store.get_or_create(params.conversation_id).await?;
        assert_eq!(session.messages.len(), 2);
        Ok(())
    }

    #[tokio::test]
    async fn model_sees_history_loaded_before_the_turn() -> ConversationResult<()> {
        let fx = fixture(ScriptedModel::replying("ok"));
        fx.workflow.start(&params("c1", "first")?).await?;
        fx.workflow.start(&params("c1", "second")?).await?;

        let calls = fx.model.calls();
        assert_eq!(calls[1].messages.len(), 4);
        assert_eq!(calls[1].messages[1].content, "first");
        Ok(())
    }

    #[tokio::test]
    async fn blank_message_is_rejected() -> ConversationResult<()> {
        let fx = fixture(ScriptedModel::replying("unused"));
        let result = fx.workflow.start(&params("c1", " ")?).await;
        assert!(matches!(result, Err(ConversationError::Validation(_))));
        assert!(fx.store.list().await?.is_empty());
        Ok(())
    }
}
