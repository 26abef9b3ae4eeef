//! Common types for inference requests

use crate::db::{Role, Turn, TurnStatus};

/// Message role on the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageRole {
    System,
    User,
    Assistant,
}

impl MessageRole {
    pub fn as_str(self) -> &'static str {
        match self {
            MessageRole::System => "system",
            MessageRole::User => "user",
            MessageRole::Assistant => "assistant",
        }
    }
}

impl From<Role> for MessageRole {
    fn from(role: Role) -> Self {
        match role {
            Role::User => MessageRole::User,
            Role::Assistant => MessageRole::Assistant,
        }
    }
}

/// One role/content pair sent to the backend
#[derive(Debug, Clone, PartialEq)]
pub struct LlmMessage {
    pub role: MessageRole,
    pub content: String,
}

impl LlmMessage {
    pub fn system(text: impl Into<String>) -> Self {
        Self {
            role: MessageRole::System,
            content: text.into(),
        }
    }

    /// Only complete turns with content are part of a conversation the
    /// model should see
    pub fn from_turn(turn: &Turn) -> Option<Self> {
        if turn.status != TurnStatus::Complete {
            return None;
        }
        let content = turn.content.clone()?;
        Some(Self {
            role: turn.role.into(),
            content,
        })
    }
}

/// Inference request: system prompt followed by the windowed history
#[derive(Debug, Clone, PartialEq)]
pub struct LlmRequest {
    pub messages: Vec<LlmMessage>,
}

impl LlmRequest {
    pub fn new(system_prompt: &str, context: &[Turn]) -> Self {
        let mut messages = Vec::with_capacity(context.len() + 1);
        messages.push(LlmMessage::system(system_prompt));
        messages.extend(context.iter().filter_map(LlmMessage::from_turn));
        Self { messages }
    }
}

/// Completed inference
#[derive(Debug, Clone, Default)]
pub struct LlmResponse {
    pub text: String,
    pub usage: Usage,
}

impl LlmResponse {
    pub fn from_text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            usage: Usage::default(),
        }
    }
}

/// Usage statistics, when the backend reports them
#[derive(Debug, Clone, Copy, Default)]
pub struct Usage {
    pub input_tokens: u64,
    pub output_tokens: u64,
}

/// Normalize raw completion text.
///
/// Some local models wrap their whole answer in quotes and emit escaped
/// newlines literally; undo both and trim surrounding whitespace.
pub fn clean_completion(raw: &str) -> String {
    let trimmed = raw.trim();
    let unquoted = trimmed
        .strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .unwrap_or(trimmed);
    unquoted.replace("\\n", "\n").replace("\\\"", "\"")
}
