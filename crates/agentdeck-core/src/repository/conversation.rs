//! ConversationRepository trait definition.
//!
//! Covers conversations and the messages stored in them.

use agentdeck_types::chat::{ChatMessage, Conversation};
use agentdeck_types::error::RepositoryError;
use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Selects conversations by owner, optionally narrowed to one agent and to
/// conversations created at or after a point in time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConversationFilter {
    pub user_id: Uuid,
    pub agent_id: Option<Uuid>,
    pub created_since: Option<DateTime<Utc>>,
    pub created_until: Option<DateTime<Utc>>,
}

impl ConversationFilter {
    pub fn for_user(user_id: Uuid) -> Self {
        Self {
            user_id,
            agent_id: None,
            created_since: None,
            created_until: None,
        }
    }

    pub fn agent(mut self, agent_id: Option<Uuid>) -> Self {
        self.agent_id = agent_id;
        self
    }

    pub fn created_since(mut self, since: DateTime<Utc>) -> Self {
        self.created_since = Some(since);
        self
    }

    pub fn created_until(mut self, until: DateTime<Utc>) -> Self {
        self.created_until = Some(until);
        self
    }

    /// Whether a conversation falls inside this filter.
    pub fn matches(&self, conversation: &Conversation) -> bool {
        conversation.user_id == self.user_id
            && self.agent_id.is_none_or(|a| conversation.agent_id == a)
            && self.created_since.is_none_or(|s| conversation.created_at >= s)
            && self.created_until.is_none_or(|u| conversation.created_at <= u)
    }
}

/// Repository trait for conversation and message persistence.
///
/// Uses native async fn in traits (RPITIT, Rust 2024 edition).
pub trait ConversationRepository: Send + Sync {
    fn create_conversation(
        &self,
        conversation: &Conversation,
    ) -> impl std::future::Future<Output = Result<Conversation, RepositoryError>> + Send;

    fn get_conversation(
        &self,
        id: &Uuid,
    ) -> impl std::future::Future<Output = Result<Option<Conversation>, RepositoryError>> + Send;

    /// Set the conversation's `updated_at`.
    fn touch_conversation(
        &self,
        id: &Uuid,
        at: DateTime<Utc>,
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;

    /// Ids of conversations matching the filter.
    fn list_conversation_ids(
        &self,
        filter: &ConversationFilter,
    ) -> impl std::future::Future<Output = Result<Vec<Uuid>, RepositoryError>> + Send;

    /// Append a message. Messages are immutable once saved.
    fn save_message(
        &self,
        message: &ChatMessage,
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;

    /// The `limit` most recent messages of a conversation, returned in
    /// ascending chronological order.
    fn list_recent_messages(
        &self,
        conversation_id: &Uuid,
        limit: u32,
    ) -> impl std::future::Future<Output = Result<Vec<ChatMessage>, RepositoryError>> + Send;

    fn count_messages(
        &self,
        conversation_id: &Uuid,
    ) -> impl std::future::Future<Output = Result<u64, RepositoryError>> + Send;
}
