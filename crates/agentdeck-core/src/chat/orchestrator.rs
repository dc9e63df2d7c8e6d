//! ChatOrchestrator owns the chat-turn workflow.
//!
//! Per turn: check the agent, load or create the conversation, load recent
//! history, persist the user message, dispatch through the router, then
//! persist the assistant message, one metric record and the conversation's
//! new `updated_at`.
//!
//! The user message is written before the provider call so it survives a
//! failed generation; no metric record is written for failed turns. Turns on
//! the same conversation are not serialized against each other.
//!
//! The post-generation writes are not transactional. If the metric record or
//! the `updated_at` bump fails after the assistant message is stored, the
//! turn returns [`ChatError::Store`] and the reply stays in the conversation
//! without a metric record.

use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::time::Instant;
use tracing::{info, warn};
use uuid::Uuid;

use agentdeck_types::chat::{ChatMessage, Conversation, MessageRole, derive_title};
use agentdeck_types::config::ChatSettings;
use agentdeck_types::error::RepositoryError;
use agentdeck_types::llm::LlmError;
use agentdeck_types::metrics::{MetricRecord, TurnMetrics};

use crate::llm::router::{GenerationRouter, RouteError};
use crate::repository::agent::AgentRepository;
use crate::repository::conversation::ConversationRepository;
use crate::repository::metric::MetricRepository;

#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    #[error("agent not found")]
    AgentNotFound,

    #[error("agent is inactive")]
    AgentInactive,

    #[error("conversation not found")]
    ConversationNotFound,

    #[error("message must not be empty")]
    EmptyMessage,

    #[error("unsupported provider: {0}")]
    UnsupportedProvider(String),

    #[error("generation failed: {0}")]
    Generation(#[from] LlmError),

    #[error("storage error: {0}")]
    Store(#[from] RepositoryError),
}

impl From<RouteError> for ChatError {
    fn from(err: RouteError) -> Self {
        match err {
            RouteError::UnsupportedProvider(tag) => ChatError::UnsupportedProvider(tag),
            RouteError::Llm(e) => ChatError::Generation(e),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ChatConfig {
    /// Most recent stored messages sent as context.
    pub history_limit: u32,
    pub title_max_chars: usize,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            history_limit: 20,
            title_max_chars: 50,
        }
    }
}

impl From<&ChatSettings> for ChatConfig {
    fn from(settings: &ChatSettings) -> Self {
        Self {
            history_limit: settings.history_limit,
            title_max_chars: settings.title_max_chars,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TurnRequest {
    pub user_id: Uuid,
    pub agent_id: Uuid,
    pub message: String,
    pub conversation_id: Option<Uuid>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TurnOutcome {
    pub conversation_id: Uuid,
    pub assistant_message: ChatMessage,
    pub metrics: TurnMetrics,
}

pub struct ChatOrchestrator<A, C, M> {
    agents: A,
    conversations: C,
    metrics: M,
    router: Arc<GenerationRouter>,
    config: ChatConfig,
}

impl<A, C, M> ChatOrchestrator<A, C, M>
where
    A: AgentRepository,
    C: ConversationRepository,
    M: MetricRepository,
{
    pub fn new(
        agents: A,
        conversations: C,
        metrics: M,
        router: Arc<GenerationRouter>,
        config: ChatConfig,
    ) -> Self {
        Self {
            agents,
            conversations,
            metrics,
            router,
            config,
        }
    }

    /// Run one turn. See the module docs for which writes survive a failure.
    pub async fn handle_turn(&self, request: TurnRequest) -> Result<TurnOutcome, ChatError> {
        let TurnRequest {
            user_id,
            agent_id,
            message,
            conversation_id,
        } = request;

        if message.trim().is_empty() {
            return Err(ChatError::EmptyMessage);
        }

        let agent = self
            .agents
            .get_agent(&agent_id)
            .await?
            .filter(|a| a.user_id == user_id)
            .ok_or(ChatError::AgentNotFound)?;
        if !agent.is_active {
            return Err(ChatError::AgentInactive);
        }

        // A misconfigured agent should not leave an orphan conversation behind.
        self.router.resolve(&agent)?;

        let conversation = match conversation_id {
            Some(id) => self
                .conversations
                .get_conversation(&id)
                .await?
                .filter(|c| c.user_id == user_id && c.agent_id == agent_id)
                .ok_or(ChatError::ConversationNotFound)?,
            None => {
                let now = Utc::now();
                let conversation = Conversation {
                    id: Uuid::now_v7(),
                    user_id,
                    agent_id,
                    title: derive_title(&message, self.config.title_max_chars),
                    created_at: now,
                    updated_at: now,
                };
                let created = self.conversations.create_conversation(&conversation).await?;
                info!(conversation_id = %created.id, agent_id = %agent_id, "Conversation created");
                created
            }
        };

        let prior_count = self.conversations.count_messages(&conversation.id).await?;
        let history = self
            .conversations
            .list_recent_messages(&conversation.id, self.config.history_limit)
            .await?;

        let user_message =
            ChatMessage::new(conversation.id, MessageRole::User, message.as_str(), None, Utc::now());
        self.conversations.save_message(&user_message).await?;

        let started = Instant::now();
        let response = match self.router.dispatch(&agent, &history, &message).await {
            Ok(response) => response,
            Err(e) => {
                warn!(
                    conversation_id = %conversation.id,
                    agent_id = %agent_id,
                    error = %e,
                    "Generation failed; user message kept"
                );
                return Err(e.into());
            }
        };
        let response_latency_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);

        let tokens_processed = response.usage.total();
        let now = Utc::now();
        let assistant_message = ChatMessage::new(
            conversation.id,
            MessageRole::Assistant,
            response.content,
            Some(tokens_processed),
            now,
        );
        self.conversations.save_message(&assistant_message).await?;

        let record = MetricRecord {
            id: Uuid::now_v7(),
            conversation_id: conversation.id,
            tokens_processed,
            response_latency_ms,
            message_count: u32::try_from(prior_count + 2).unwrap_or(u32::MAX),
            timestamp: now,
        };
        self.metrics.save_metric(&record).await?;
        self.conversations.touch_conversation(&conversation.id, now).await?;

        info!(
            conversation_id = %conversation.id,
            tokens = tokens_processed,
            latency_ms = response_latency_ms,
            "Chat turn completed"
        );

        Ok(TurnOutcome {
            conversation_id: conversation.id,
            assistant_message,
            metrics: TurnMetrics {
                tokens_processed,
                response_latency_ms,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::box_provider::BoxLlmProvider;
    use crate::llm::registry::ProviderRegistry;
    use crate::test_support::{InMemoryStore, MockProvider, agent_for};
    use agentdeck_types::llm::ProviderKind;

    type TestOrchestrator = ChatOrchestrator<InMemoryStore, InMemoryStore, InMemoryStore>;

    fn orchestrator(store: &InMemoryStore, provider: MockProvider) -> TestOrchestrator {
        let mut registry = ProviderRegistry::new();
        registry.register(BoxLlmProvider::new(provider));
        let router = Arc::new(GenerationRouter::new(registry, ProviderKind::OpenAi));
        ChatOrchestrator::new(
            store.clone(),
            store.clone(),
            store.clone(),
            router,
            ChatConfig::default(),
        )
    }

    fn turn(user_id: Uuid, agent_id: Uuid, message: &str, conversation_id: Option<Uuid>) -> TurnRequest {
        TurnRequest {
            user_id,
            agent_id,
            message: message.to_string(),
            conversation_id,
        }
    }

    #[tokio::test]
    async fn test_first_turn_creates_conversation() {
        let store = InMemoryStore::new();
        let user_id = Uuid::now_v7();
        let agent = agent_for(user_id, "openai", "gpt-4.1");
        store.insert_agent(agent.clone());
        let orch = orchestrator(&store, MockProvider::replying(ProviderKind::OpenAi, "Hi there"));

        let outcome = orch.handle_turn(turn(user_id, agent.id, "Hello", None)).await.unwrap();

        let conversations = store.conversations();
        assert_eq!(conversations.len(), 1);
        assert_eq!(conversations[0].id, outcome.conversation_id);
        assert_eq!(conversations[0].title, "Hello");
        assert_eq!(outcome.assistant_message.content, "Hi there");
        assert_eq!(outcome.assistant_message.token_count, Some(20));
        assert!(outcome.metrics.tokens_processed > 0);

        let messages = store.messages(outcome.conversation_id);
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, MessageRole::User);
        assert_eq!(messages[1].role, MessageRole::Assistant);

        let metrics = store.metrics();
        assert_eq!(metrics.len(), 1);
        assert_eq!(metrics[0].message_count, 2);
        assert_eq!(metrics[0].tokens_processed, 20);
    }

    #[tokio::test]
    async fn test_metric_write_failure_keeps_both_messages() {
        let store = InMemoryStore::new();
        let user_id = Uuid::now_v7();
        let agent = agent_for(user_id, "openai", "gpt-4.1");
        store.insert_agent(agent.clone());
        store.set_fail_metric_writes(true);
        let orch = orchestrator(&store, MockProvider::replying(ProviderKind::OpenAi, "Hi there"));

        let err = orch
            .handle_turn(turn(user_id, agent.id, "Hello", None))
            .await
            .unwrap_err();
        assert!(matches!(err, ChatError::Store(_)));

        let conversation_id = store.conversations()[0].id;
        let messages = store.messages(conversation_id);
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[1].role, MessageRole::Assistant);
        assert!(store.metrics().is_empty());
    }

    #[tokio::test]
    async fn test_title_truncated_to_fifty_chars() {
        let store = InMemoryStore::new();
        let user_id = Uuid::now_v7();
        let agent = agent_for(user_id, "openai", "gpt-4.1");
        store.insert_agent(agent.clone());
        let orch = orchestrator(&store, MockProvider::replying(ProviderKind::OpenAi, "ok"));

        let long = "ü".repeat(120);
        orch.handle_turn(turn(user_id, agent.id, &long, None)).await.unwrap();

        assert_eq!(store.conversations()[0].title.chars().count(), 50);
    }

    #[tokio::test]
    async fn test_follow_up_turn_counts_prior_messages_and_sends_history() {
        let store = InMemoryStore::new();
        let user_id = Uuid::now_v7();
        let agent = agent_for(user_id, "openai", "gpt-4.1");
        store.insert_agent(agent.clone());
        let provider = MockProvider::replying(ProviderKind::OpenAi, "reply");
        let requests = provider.requests();
        let orch = orchestrator(&store, provider);

        let first = orch.handle_turn(turn(user_id, agent.id, "one", None)).await.unwrap();
        let before = store.conversations()[0].updated_at;
        orch.handle_turn(turn(user_id, agent.id, "two", Some(first.conversation_id)))
            .await
            .unwrap();

        let metrics = store.metrics();
        assert_eq!(metrics.len(), 2);
        assert_eq!(metrics[1].message_count, 4);
        assert!(store.conversations()[0].updated_at >= before);

        let sent = requests.lock().unwrap();
        let contents: Vec<&str> = sent[1].messages.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec!["one", "reply", "two"]);
    }

    #[tokio::test]
    async fn test_history_is_capped() {
        let store = InMemoryStore::new();
        let user_id = Uuid::now_v7();
        let agent = agent_for(user_id, "openai", "gpt-4.1");
        store.insert_agent(agent.clone());
        let provider = MockProvider::replying(ProviderKind::OpenAi, "r");
        let requests = provider.requests();
        let orch = orchestrator(&store, provider);

        let first = orch.handle_turn(turn(user_id, agent.id, "m0", None)).await.unwrap();
        for i in 1..15 {
            let msg = format!("m{i}");
            orch.handle_turn(turn(user_id, agent.id, &msg, Some(first.conversation_id)))
                .await
                .unwrap();
        }

        let sent = requests.lock().unwrap();
        // 20 history messages plus the new user message
        assert_eq!(sent.last().unwrap().messages.len(), 21);
        assert_eq!(sent.last().unwrap().messages.last().unwrap().content, "m14");
        assert_eq!(store.metrics().last().unwrap().message_count, 30);
    }

    #[tokio::test]
    async fn test_adapter_failure_keeps_user_message_without_metric() {
        let store = InMemoryStore::new();
        let user_id = Uuid::now_v7();
        let agent = agent_for(user_id, "openai", "gpt-4.1");
        store.insert_agent(agent.clone());
        let orch = orchestrator(
            &store,
            MockProvider::failing(ProviderKind::OpenAi, LlmError::ContentFiltered("policy".into())),
        );

        let err = orch.handle_turn(turn(user_id, agent.id, "Hello", None)).await.unwrap_err();
        assert!(matches!(err, ChatError::Generation(LlmError::ContentFiltered(_))));

        let conversation = &store.conversations()[0];
        let messages = store.messages(conversation.id);
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].role, MessageRole::User);
        assert!(store.metrics().is_empty());
    }

    #[tokio::test]
    async fn test_agent_of_another_user_is_not_found() {
        let store = InMemoryStore::new();
        let agent = agent_for(Uuid::now_v7(), "openai", "gpt-4.1");
        store.insert_agent(agent.clone());
        let orch = orchestrator(&store, MockProvider::replying(ProviderKind::OpenAi, "x"));

        let err = orch
            .handle_turn(turn(Uuid::now_v7(), agent.id, "Hello", None))
            .await
            .unwrap_err();
        assert!(matches!(err, ChatError::AgentNotFound));
        assert!(store.conversations().is_empty());
    }

    #[tokio::test]
    async fn test_inactive_agent_is_refused() {
        let store = InMemoryStore::new();
        let user_id = Uuid::now_v7();
        let mut agent = agent_for(user_id, "openai", "gpt-4.1");
        agent.is_active = false;
        store.insert_agent(agent.clone());
        let orch = orchestrator(&store, MockProvider::replying(ProviderKind::OpenAi, "x"));

        let err = orch.handle_turn(turn(user_id, agent.id, "Hello", None)).await.unwrap_err();
        assert!(matches!(err, ChatError::AgentInactive));
    }

    #[tokio::test]
    async fn test_conversation_of_other_agent_is_not_found() {
        let store = InMemoryStore::new();
        let user_id = Uuid::now_v7();
        let agent = agent_for(user_id, "openai", "gpt-4.1");
        let other = agent_for(user_id, "openai", "gpt-4.1");
        store.insert_agent(agent.clone());
        store.insert_agent(other.clone());
        let orch = orchestrator(&store, MockProvider::replying(ProviderKind::OpenAi, "x"));

        let first = orch.handle_turn(turn(user_id, other.id, "Hello", None)).await.unwrap();
        let err = orch
            .handle_turn(turn(user_id, agent.id, "Hi", Some(first.conversation_id)))
            .await
            .unwrap_err();
        assert!(matches!(err, ChatError::ConversationNotFound));

        let err = orch
            .handle_turn(turn(user_id, agent.id, "Hi", Some(Uuid::now_v7())))
            .await
            .unwrap_err();
        assert!(matches!(err, ChatError::ConversationNotFound));
    }

    #[tokio::test]
    async fn test_blank_message_rejected() {
        let store = InMemoryStore::new();
        let orch = orchestrator(&store, MockProvider::replying(ProviderKind::OpenAi, "x"));
        let err = orch
            .handle_turn(turn(Uuid::now_v7(), Uuid::now_v7(), "   ", None))
            .await
            .unwrap_err();
        assert!(matches!(err, ChatError::EmptyMessage));
    }

    #[tokio::test]
    async fn test_unsupported_provider_writes_nothing() {
        let store = InMemoryStore::new();
        let user_id = Uuid::now_v7();
        let agent = agent_for(user_id, "mistral", "mistral-large");
        store.insert_agent(agent.clone());
        let orch = orchestrator(&store, MockProvider::replying(ProviderKind::OpenAi, "x"));

        let err = orch.handle_turn(turn(user_id, agent.id, "Hello", None)).await.unwrap_err();
        assert!(matches!(err, ChatError::UnsupportedProvider(_)));
        assert!(store.conversations().is_empty());
    }
}
