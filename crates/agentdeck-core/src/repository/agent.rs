//! Agent repository trait definition.

use agentdeck_types::agent::Agent;
use agentdeck_types::error::RepositoryError;
use uuid::Uuid;

/// Repository trait for agent persistence.
///
/// Implementations live in agentdeck-infra (e.g., `SqliteAgentRepository`).
pub trait AgentRepository: Send + Sync {
    fn create_agent(
        &self,
        agent: &Agent,
    ) -> impl std::future::Future<Output = Result<Agent, RepositoryError>> + Send;

    fn get_agent(
        &self,
        id: &Uuid,
    ) -> impl std::future::Future<Output = Result<Option<Agent>, RepositoryError>> + Send;

    /// Number of agents owned by a user.
    fn count_agents(
        &self,
        user_id: &Uuid,
    ) -> impl std::future::Future<Output = Result<u64, RepositoryError>> + Send;
}
