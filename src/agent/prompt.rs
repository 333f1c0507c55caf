//! Prompt text and prompt construction.

use crate::agent::analysis::AnalysisType;
use crate::conversation::{ConversationMessage, MessageRole};
use crate::llm::PromptMessage;

/// System prompt framing every chat reply.
pub const SYSTEM_PROMPT: &str =
    "You are a helpful AI assistant. Provide clear, concise, and accurate responses.";

/// Reply returned when the model call fails.
pub const MODEL_FAILURE_REPLY: &str =
    "I encountered an error while processing your message. Please try again.";

/// Reply returned when the model answers with nothing.
pub const EMPTY_REPLY: &str = "I apologize, but I could not generate a response.";

/// Analysis result when the model fails or answers with nothing.
pub const ANALYSIS_FALLBACK: &str = "Analysis could not be completed.";

/// Title of a conversation without messages.
pub const DEFAULT_TITLE: &str = "New Conversation";

/// Longest title kept, in characters.
pub const MAX_TITLE_CHARS: usize = 50;

const TITLE_PROMPT: &str = "Generate a short, descriptive title (max 5 words) for this conversation based on the first message.";

/// System prompt for one analysis kind.
#[must_use]
pub const fn analysis_prompt(kind: AnalysisType) -> &'static str {
    match kind {
        AnalysisType::Sentiment => {
            "Analyze the sentiment of this conversation. Provide a brief summary of the overall tone and emotional context."
        }
        AnalysisType::Summary => {
            "Provide a concise summary of the key points discussed in this conversation."
        }
        AnalysisType::Topics => {
            "Identify the main topics and themes discussed in this conversation. List them as bullet points."
        }
    }
}

/// `[system, ...history, user]` for a chat reply.
#[must_use]
pub fn chat_messages(history: &[ConversationMessage], user_text: &str) -> Vec<PromptMessage> {
    let mut messages = Vec::with_capacity(history.len() + 2);
    messages.push(PromptMessage::system(SYSTEM_PROMPT));
    messages.extend(history.iter().map(PromptMessage::from));
    messages.push(PromptMessage::user(user_text));
    messages
}

/// Render every message as a `role: content` line, in stored order.
#[must_use]
pub fn render_transcript(messages: &[ConversationMessage]) -> String {
    messages
        .iter()
        .map(|message| format!("{}: {}", message.role, message.content))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Prompt for an analysis over the whole transcript.
#[must_use]
pub fn analysis_messages(kind: AnalysisType, messages: &[ConversationMessage]) -> Vec<PromptMessage> {
    vec![
        PromptMessage::system(analysis_prompt(kind)),
        PromptMessage::user(render_transcript(messages)),
    ]
}

/// Prompt asking for a title based on the first user message.
#[must_use]
pub fn title_messages(first_user_message: &str) -> Vec<PromptMessage> {
    vec![
        PromptMessage::system(TITLE_PROMPT),
        PromptMessage::user(first_user_message),
    ]
}

/// First user message of a conversation, if any.
#[must_use]
pub fn first_user_message(messages: &[ConversationMessage]) -> Option<&str> {
    messages
        .iter()
        .find(|message| message.role == MessageRole::User)
        .map(|message| message.content.as_str())
        .filter(|content| !content.trim().is_empty())
}

/// Title derived from the message itself, used when the model gives none.
#[must_use]
pub fn fallback_title(first_user_message: &str) -> String {
    let trimmed = first_user_message.trim();
    let mut chars = trimmed.chars();
    let head: String = chars.by_ref().take(MAX_TITLE_CHARS).collect();
    if chars.next().is_some() {
        format!("{head}...")
    } else {
        head
    }
}

/// Strip quoting and markdown emphasis from a model title and cap its length.
#[must_use]
pub fn clean_title(raw: &str) -> Option<String> {
    let cleaned = raw
        .lines()
        .find(|line| !line.trim().is_empty())?
        .trim()
        .trim_start_matches("Title:")
        .replace(['"', '*', '`'], "")
        .trim()
        .to_string();
    if cleaned.is_empty() {
        return None;
    }
    Some(cleaned.chars().take(MAX_TITLE_CHARS).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conversation::{ConversationId, ConversationResult, ConversationSession, MessageDraft};
    use crate::llm::ChatRole;

    fn session(turns: &[MessageDraft]) -> ConversationResult<ConversationSession> {
        let mut session = ConversationSession::new(ConversationId::parse("c1")?, 0);
        for (offset, draft) in (0_i64..).zip(turns.iter().cloned()) {
            session.push_message(draft, offset);
        }
        Ok(session)
    }

    #[test]
    fn chat_prompt_wraps_history() -> ConversationResult<()> {
        let session = session(&[MessageDraft::user("hi"), MessageDraft::assistant("hello")])?;
        let messages = chat_messages(&session.messages, "how are you?");

        let roles: Vec<ChatRole> = messages.iter().map(|m| m.role).collect();
        assert_eq!(
            roles,
            vec![ChatRole::System, ChatRole::User, ChatRole::Assistant, ChatRole::User]
        );
        assert_eq!(messages[0].content, SYSTEM_PROMPT);
        assert_eq!(messages[3].content, "how are you?");
        Ok(())
    }

    #[test]
    fn transcript_is_role_prefixed_lines() -> ConversationResult<()> {
        let session = session(&[
            MessageDraft::user("a"),
            MessageDraft::assistant("b"),
            MessageDraft::user("c"),
        ])?;
        assert_eq!(render_transcript(&session.messages), "user: a\nassistant: b\nuser: c");
        assert_eq!(render_transcript(&[]), "");
        Ok(())
    }

    #[test]
    fn fallback_title_only_marks_truncation() {
        assert_eq!(fallback_title("Short question"), "Short question");
        let long = "x".repeat(60);
        assert_eq!(fallback_title(&long), format!("{}...", "x".repeat(50)));
        assert_eq!(fallback_title(&"é".repeat(50)), "é".repeat(50));
    }

    #[test]
    fn model_titles_are_cleaned() {
        assert_eq!(clean_title("\"Rust Lifetimes\"").as_deref(), Some("Rust Lifetimes"));
        assert_eq!(clean_title("**Trip Plan**\nextra").as_deref(), Some("Trip Plan"));
        assert_eq!(clean_title("Title: Weekly Budget").as_deref(), Some("Weekly Budget"));
        assert_eq!(clean_title("  \n \"\" "), None);
        assert_eq!(clean_title(&"y".repeat(80)).map(|t| t.len()), Some(50));
    }

    #[test]
    fn first_user_message_skips_assistant_turns() -> ConversationResult<()> {
        let session = session(&[MessageDraft::assistant("welcome"), MessageDraft::user("plan a trip")])?;
        assert_eq!(first_user_message(&session.messages), Some("plan a trip"));
        assert_eq!(first_user_message(&[]), None);
        Ok(())
    }
}
