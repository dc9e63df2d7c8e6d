//! Metrics Aggregator: summary statistics over stored per-turn records.
//!
//! Pure read side. The conversation set is resolved first (conversations in
//! scope created inside the window), then their records with
//! `now - period <= timestamp <= now` are reduced. An empty scope is not an error.

use chrono::{DateTime, Utc};
use tracing::debug;

use agentdeck_types::error::RepositoryError;
use agentdeck_types::metrics::{MetricsReport, MetricsScope, MetricsSummary, Period};

use crate::repository::agent::AgentRepository;
use crate::repository::conversation::{ConversationFilter, ConversationRepository};
use crate::repository::metric::MetricRepository;

#[derive(Debug, thiserror::Error)]
pub enum MetricsError {
    #[error("agent not found")]
    AgentNotFound,

    #[error("storage error: {0}")]
    Store(#[from] RepositoryError),
}

pub struct MetricsAggregator<A, C, M> {
    agents: A,
    conversations: C,
    metrics: M,
}

impl<A, C, M> MetricsAggregator<A, C, M>
where
    A: AgentRepository,
    C: ConversationRepository,
    M: MetricRepository,
{
    pub fn new(agents: A, conversations: C, metrics: M) -> Self {
        Self {
            agents,
            conversations,
            metrics,
        }
    }

    pub async fn summarize(
        &self,
        scope: MetricsScope,
        period: Period,
    ) -> Result<MetricsReport, MetricsError> {
        self.summarize_at(scope, period, Utc::now()).await
    }

    /// Summarize the window `[now - period, now]`.
    pub async fn summarize_at(
        &self,
        scope: MetricsScope,
        period: Period,
        now: DateTime<Utc>,
    ) -> Result<MetricsReport, MetricsError> {
        let user_id = scope.user_id();
        if let Some(agent_id) = scope.agent_id() {
            self.agents
                .get_agent(&agent_id)
                .await?
                .filter(|a| a.user_id == user_id)
                .ok_or(MetricsError::AgentNotFound)?;
        }

        let start = period.window_start(now);
        let filter = ConversationFilter::for_user(user_id)
            .agent(scope.agent_id())
            .created_since(start)
            .created_until(now);
        let conversation_ids = self.conversations.list_conversation_ids(&filter).await?;

        let records = if conversation_ids.is_empty() {
            Vec::new()
        } else {
            self.metrics
                .list_metrics_between(&conversation_ids, start, now)
                .await?
        };

        let total_agents = match scope {
            MetricsScope::User { user_id } => Some(self.agents.count_agents(&user_id).await?),
            MetricsScope::Agent { .. } => None,
        };

        let summary = MetricsSummary::from_records(
            &records,
            conversation_ids.len() as u64,
            total_agents,
            period,
        );
        debug!(
            user_id = %user_id,
            period = %period,
            records = records.len(),
            conversations = conversation_ids.len(),
            "Metrics summarized"
        );

        Ok(MetricsReport { summary, records })
    }
}
