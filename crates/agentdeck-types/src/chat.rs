//! Conversation and stored message types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub use crate::llm::MessageRole;

/// A conversation between one user and one agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Conversation {
    pub id: Uuid,
    pub user_id: Uuid,
    pub agent_id: Uuid,
    pub title: String,
    pub created_at: DateTime<Utc>,
    /// Bumped after every completed turn.
    pub updated_at: DateTime<Utc>,
}

/// A persisted chat message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: Uuid,
    pub conversation_id: Uuid,
    pub role: MessageRole,
    pub content: String,
    /// Total tokens of the turn, set on assistant messages only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token_count: Option<u32>,
    pub created_at: DateTime<Utc>,
}

impl ChatMessage {
    pub fn new(
        conversation_id: Uuid,
        role: MessageRole,
        content: impl Into<String>,
        token_count: Option<u32>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::now_v7(),
            conversation_id,
            role,
            content: content.into(),
            token_count,
            created_at,
        }
    }
}

/// Conversation title derived from the opening message: at most
/// `max_chars` characters, never splitting a character.
pub fn derive_title(message: &str, max_chars: usize) -> String {
    message.chars().take(max_chars).collect()
}
