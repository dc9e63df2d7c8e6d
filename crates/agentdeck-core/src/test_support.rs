//! In-memory collaborators shared by the unit tests of this crate.

use std::collections::HashMap;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use futures_util::Stream;
use uuid::Uuid;

use agentdeck_types::agent::Agent;
use agentdeck_types::chat::{ChatMessage, Conversation};
use agentdeck_types::error::RepositoryError;
use agentdeck_types::llm::{
    CompletionRequest, CompletionResponse, LlmError, ProviderKind, StreamEvent, Usage,
};
use agentdeck_types::metrics::MetricRecord;
use agentdeck_types::user::User;

use crate::llm::provider::LlmProvider;
use crate::repository::agent::AgentRepository;
use crate::repository::conversation::{ConversationFilter, ConversationRepository};
use crate::repository::metric::MetricRepository;
use crate::repository::user::UserRepository;

pub fn agent_for(user_id: Uuid, provider: &str, model: &str) -> Agent {
    let now = Utc::now();
    Agent {
        id: Uuid::now_v7(),
        user_id,
        name: "Helper".to_string(),
        system_prompt: "You are helpful.".to_string(),
        model: model.to_string(),
        provider: provider.to_string(),
        temperature: 0.7,
        max_tokens: 1000,
        is_active: true,
        created_at: now,
        updated_at: now,
    }
}

pub fn user(id: Uuid) -> User {
    User {
        id,
        email: format!("{id}@example.com"),
        name: None,
        created_at: Utc::now(),
    }
}

/// Provider that answers every call with the same scripted outcome and
/// records the requests it saw.
pub struct MockProvider {
    kind: ProviderKind,
    outcome: Result<String, LlmError>,
    usage: Usage,
    requests: Arc<Mutex<Vec<CompletionRequest>>>,
}

impl MockProvider {
    pub fn replying(kind: ProviderKind, reply: &str) -> Self {
        Self {
            kind,
            outcome: Ok(reply.to_string()),
            usage: Usage {
                prompt_tokens: 12,
                completion_tokens: 8,
            },
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn failing(kind: ProviderKind, error: LlmError) -> Self {
        Self {
            outcome: Err(error),
            ..Self::replying(kind, "")
        }
    }

    pub fn requests(&self) -> Arc<Mutex<Vec<CompletionRequest>>> {
        self.requests.clone()
    }
}

impl LlmProvider for MockProvider {
    fn name(&self) -> &str {
        "mock"
    }

    fn kind(&self) -> ProviderKind {
        self.kind
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<CompletionResponse, LlmError> {
        self.requests.lock().unwrap().push(request.clone());
        let content = self.outcome.clone()?;
        Ok(CompletionResponse {
            content,
            model: request.model.clone(),
            usage: self.usage,
        })
    }

    fn stream(
        &self,
        request: CompletionRequest,
    ) -> Pin<Box<dyn Stream<Item = Result<StreamEvent, LlmError>> + Send + 'static>> {
        self.requests.lock().unwrap().push(request);
        let events = match &self.outcome {
            Ok(text) => vec![
                Ok(StreamEvent::TextDelta { text: text.clone() }),
                Ok(StreamEvent::Usage(self.usage)),
                Ok(StreamEvent::Done),
            ],
            Err(e) => vec![Err(e.clone())],
        };
        Box::pin(futures_util::stream::iter(events))
    }
}

#[derive(Default)]
struct Tables {
    users: HashMap<Uuid, User>,
    agents: HashMap<Uuid, Agent>,
    conversations: HashMap<Uuid, Conversation>,
    messages: Vec<ChatMessage>,
    metrics: Vec<MetricRecord>,
}

/// Shared in-memory store implementing every repository trait.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    tables: Arc<Mutex<Tables>>,
    fail_metric_reads: Arc<AtomicBool>,
    fail_metric_writes: Arc<AtomicBool>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_user(&self, user: User) {
        self.tables.lock().unwrap().users.insert(user.id, user);
    }

    pub fn insert_agent(&self, agent: Agent) {
        self.tables.lock().unwrap().agents.insert(agent.id, agent);
    }

    pub fn insert_conversation(&self, conversation: Conversation) {
        self.tables
            .lock()
            .unwrap()
            .conversations
            .insert(conversation.id, conversation);
    }

    pub fn conversations(&self) -> Vec<Conversation> {
        self.tables.lock().unwrap().conversations.values().cloned().collect()
    }

    pub fn messages(&self, conversation_id: Uuid) -> Vec<ChatMessage> {
        self.tables
            .lock()
            .unwrap()
            .messages
            .iter()
            .filter(|m| m.conversation_id == conversation_id)
            .cloned()
            .collect()
    }

    pub fn metrics(&self) -> Vec<MetricRecord> {
        self.tables.lock().unwrap().metrics.clone()
    }

    pub fn push_metric(&self, record: MetricRecord) {
        self.tables.lock().unwrap().metrics.push(record);
    }

    /// Make metric reads fail until switched back.
    pub fn set_fail_metric_reads(&self, fail: bool) {
        self.fail_metric_reads.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_metric_writes(&self, fail: bool) {
        self.fail_metric_writes.store(fail, Ordering::SeqCst);
    }
}

impl UserRepository for InMemoryStore {
    async fn create_user(&self, user: &User) -> Result<User, RepositoryError> {
        let mut tables = self.tables.lock().unwrap();
        if tables.users.values().any(|u| u.email == user.email) {
            return Err(RepositoryError::Conflict(user.email.clone()));
        }
        tables.users.insert(user.id, user.clone());
        Ok(user.clone())
    }

    async fn get_user(&self, id: &Uuid) -> Result<Option<User>, RepositoryError> {
        Ok(self.tables.lock().unwrap().users.get(id).cloned())
    }
}

impl AgentRepository for InMemoryStore {
    async fn create_agent(&self, agent: &Agent) -> Result<Agent, RepositoryError> {
        self.insert_agent(agent.clone());
        Ok(agent.clone())
    }

    async fn get_agent(&self, id: &Uuid) -> Result<Option<Agent>, RepositoryError> {
        Ok(self.tables.lock().unwrap().agents.get(id).cloned())
    }

    async fn count_agents(&self, user_id: &Uuid) -> Result<u64, RepositoryError> {
        let tables = self.tables.lock().unwrap();
        Ok(tables.agents.values().filter(|a| a.user_id == *user_id).count() as u64)
    }
}

impl ConversationRepository for InMemoryStore {
    async fn create_conversation(
        &self,
        conversation: &Conversation,
    ) -> Result<Conversation, RepositoryError> {
        self.insert_conversation(conversation.clone());
        Ok(conversation.clone())
    }

    async fn get_conversation(&self, id: &Uuid) -> Result<Option<Conversation>, RepositoryError> {
        Ok(self.tables.lock().unwrap().conversations.get(id).cloned())
    }

    async fn touch_conversation(&self, id: &Uuid, at: DateTime<Utc>) -> Result<(), RepositoryError> {
        let mut tables = self.tables.lock().unwrap();
        let conversation = tables
            .conversations
            .get_mut(id)
            .ok_or(RepositoryError::NotFound)?;
        conversation.updated_at = at;
        Ok(())
    }

    async fn list_conversation_ids(
        &self,
        filter: &ConversationFilter,
    ) -> Result<Vec<Uuid>, RepositoryError> {
        let tables = self.tables.lock().unwrap();
        Ok(tables
            .conversations
            .values()
            .filter(|c| filter.matches(c))
            .map(|c| c.id)
            .collect())
    }

    async fn save_message(&self, message: &ChatMessage) -> Result<(), RepositoryError> {
        self.tables.lock().unwrap().messages.push(message.clone());
        Ok(())
    }

    async fn list_recent_messages(
        &self,
        conversation_id: &Uuid,
        limit: u32,
    ) -> Result<Vec<ChatMessage>, RepositoryError> {
        let mut messages = self.messages(*conversation_id);
        messages.sort_by(|a, b| (a.created_at, a.id).cmp(&(b.created_at, b.id)));
        let skip = messages.len().saturating_sub(limit as usize);
        Ok(messages.split_off(skip))
    }

    async fn count_messages(&self, conversation_id: &Uuid) -> Result<u64, RepositoryError> {
        Ok(self.messages(*conversation_id).len() as u64)
    }
}

impl InMemoryStore {
    /// Records of the given conversations with `timestamp >= since`, oldest first.
    fn metrics_from(
        &self,
        conversation_ids: &[Uuid],
        since: DateTime<Utc>,
    ) -> Result<Vec<MetricRecord>, RepositoryError> {
        if self.fail_metric_reads.load(Ordering::SeqCst) {
            return Err(RepositoryError::Query("metrics table unavailable".into()));
        }
        let mut records: Vec<MetricRecord> = self
            .metrics()
            .into_iter()
            .filter(|r| conversation_ids.contains(&r.conversation_id) && r.timestamp >= since)
            .collect();
        records.sort_by_key(|r| r.timestamp);
        Ok(records)
    }
}

impl MetricRepository for InMemoryStore {
    async fn save_metric(&self, record: &MetricRecord) -> Result<(), RepositoryError> {
        if self.fail_metric_writes.load(Ordering::SeqCst) {
            return Err(RepositoryError::Query("metrics table is read-only".into()));
        }
        self.push_metric(record.clone());
        Ok(())
    }

    async fn list_metrics_between(
        &self,
        conversation_ids: &[Uuid],
        since: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> Result<Vec<MetricRecord>, RepositoryError> {
        let mut records = self.metrics_from(conversation_ids, since)?;
        records.retain(|r| r.timestamp <= until);
        Ok(records)
    }

    async fn list_recent_metrics(
        &self,
        conversation_ids: &[Uuid],
        since: DateTime<Utc>,
        limit: u32,
    ) -> Result<Vec<MetricRecord>, RepositoryError> {
        let mut records = self.metrics_from(conversation_ids, since)?;
        records.reverse();
        records.truncate(limit as usize);
        Ok(records)
    }
}
