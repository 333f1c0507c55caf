//! Conversation state: identifiers, the session model and durable stores.
//!
//! - `types`: sessions, messages and the rules for appending and patching
//! - `store`: the `ConversationStore` trait
//! - `sqlite_store` / `memory_store`: backends
//! - `lanes`: per-conversation serialization for multi-step callers

pub mod clock;
pub mod errors;
pub mod ids;
pub mod lanes;
pub mod memory_store;
pub mod sqlite_store;
pub mod store;
pub mod types;

pub use clock::{Clock, ManualClock, SystemClock};
pub use errors::{ConversationError, ConversationResult};
pub use ids::{ConversationId, MessageId};
pub use lanes::{ConversationLanes, LaneGuard};
pub use memory_store::MemoryConversationStore;
pub use sqlite_store::SqliteConversationStore;
pub use store::{ConversationStore, StoreFuture};
pub use types::{ConversationMessage, ConversationSession, MessageDraft, MessageRole, SessionPatch};
