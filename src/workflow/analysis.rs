//! Conversation analysis as a step pipeline.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::agent::{AnalysisType, ChatAgent};
use crate::conversation::{
    Clock, ConversationError, ConversationId, ConversationResult, ConversationSession,
    ConversationStore,
};
use crate::workflow::step::{StepRecord, WorkflowRun};

/// Input of an analysis workflow.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisWorkflowParams {
    /// Conversation to analyze.
    pub conversation_id: ConversationId,
    /// Kind of analysis.
    pub analysis_type: AnalysisType,
}

/// One analysis result.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisResult {
    /// Kind of analysis.
    #[serde(rename = "type")]
    pub kind: AnalysisType,
    /// Model output or the fallback text.
    pub result: String,
    /// When the analysis finished, in ms since epoch.
    pub timestamp: i64,
}

/// Result of a completed analysis workflow.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisWorkflowOutput {
    /// Always true for a completed run.
    pub success: bool,
    /// Run identifier.
    pub workflow_id: String,
    /// Analyzed conversation.
    pub conversation_id: ConversationId,
    /// The analysis.
    pub analysis: AnalysisResult,
    /// Steps of this attempt.
    pub steps: Vec<StepRecord>,
}

/// Analysis workflow over shared capabilities.
pub struct AnalysisWorkflow {
    store: Arc<dyn ConversationStore>,
    agent: Arc<ChatAgent>,
    clock: Arc<dyn Clock>,
    analysis_delay: Duration,
}

impl AnalysisWorkflow {
    /// Build the workflow.
    #[must_use]
    pub const fn new(
        store: Arc<dyn ConversationStore>,
        agent: Arc<ChatAgent>,
        clock: Arc<dyn Clock>,
        analysis_delay: Duration,
    ) -> Self {
        Self {
            store,
            agent,
            clock,
            analysis_delay,
        }
    }

    /// Start a fresh run named `analysis_{conversationId}_{type}_{ms}`.
    ///
    /// # Errors
    /// Returns a storage error if the conversation cannot be read.
    pub async fn start(
        &self,
        params: &AnalysisWorkflowParams,
    ) -> ConversationResult<AnalysisWorkflowOutput> {
        let mut run = WorkflowRun::new(format!(
            "analysis_{}_{}_{}",
            params.conversation_id,
            params.analysis_type,
            self.clock.now_ms()
        ));
        self.run(&mut run, params).await
    }

    /// Execute (or resume) `run`.
    ///
    /// # Errors
    /// Returns a storage error if the conversation cannot be read.
    pub async fn run(
        &self,
        run: &mut WorkflowRun,
        params: &AnalysisWorkflowParams,
    ) -> ConversationResult<AnalysisWorkflowOutput> {
        let id = &params.conversation_id;
        run.begin_attempt();

        let conversation: ConversationSession = run
            .step("fetch-conversation", || async move {
                self.store.get_or_create(id.clone()).await
            })
            .await?;

        let messages = conversation.messages.as_slice();
        let analysis: AnalysisResult = run
            .step("perform-analysis", || async move {
                let result = self.agent.analyze(params.analysis_type, messages).await;
                Ok::<_, ConversationError>(AnalysisResult {
                    kind: params.analysis_type,
                    result,
                    timestamp: self.clock.now_ms(),
                })
            })
            .await?;

        run.sleep("analysis-delay", self.analysis_delay).await;
        info!(
            "Analysis {} of {id} finished ({} messages)",
            params.analysis_type,
            messages.len()
        );

        Ok(AnalysisWorkflowOutput {
            success: true,
            workflow_id: run.id().to_string(),
            conversation_id: id.clone(),
            analysis,
            steps: run.steps().to_vec(),
        })
    }
}
