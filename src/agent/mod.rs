//! Chat agent and conversation orchestration.
//!
//! - `prompt`: prompt text and construction
//! - `chat_agent`: model calls with fallback handling
//! - `relay`: the ordered per-conversation relay sequence

pub mod analysis;
pub mod chat_agent;
pub mod prompt;
pub mod relay;

pub use analysis::AnalysisType;
pub use chat_agent::{AgentReply, ChatAgent};
pub use relay::ConversationRelay;
