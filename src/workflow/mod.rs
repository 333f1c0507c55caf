//! Multi-step pipelines with memoized, independently retryable steps.

pub mod analysis;
pub mod conversation;
pub mod step;

pub use analysis::{AnalysisResult, AnalysisWorkflow, AnalysisWorkflowOutput, AnalysisWorkflowParams};
pub use conversation::{ConversationWorkflow, ConversationWorkflowOutput, ConversationWorkflowParams};
pub use step::{StepRecord, StepStatus, WorkflowRun};
