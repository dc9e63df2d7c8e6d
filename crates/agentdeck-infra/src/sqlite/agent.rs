//! SQLite agent repository implementation.

use agentdeck_core::repository::agent::AgentRepository;
use agentdeck_types::agent::Agent;
use agentdeck_types::error::RepositoryError;
use sqlx::Row;
use uuid::Uuid;

use super::pool::DatabasePool;
use super::{format_datetime, parse_datetime, parse_uuid, query_error};

#[derive(Clone)]
pub struct SqliteAgentRepository {
    pool: DatabasePool,
}

impl SqliteAgentRepository {
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }
}

struct AgentRow {
    id: String,
    user_id: String,
    name: String,
    system_prompt: String,
    model: String,
    provider: String,
    temperature: f64,
    max_tokens: i64,
    is_active: bool,
    created_at: String,
    updated_at: String,
}

impl AgentRow {
    fn from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            user_id: row.try_get("user_id")?,
            name: row.try_get("name")?,
            system_prompt: row.try_get("system_prompt")?,
            model: row.try_get("model")?,
            provider: row.try_get("provider")?,
            temperature: row.try_get("temperature")?,
            max_tokens: row.try_get("max_tokens")?,
            is_active: row.try_get("is_active")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }

    fn into_agent(self) -> Result<Agent, RepositoryError> {
        Ok(Agent {
            id: parse_uuid(&self.id, "agent id")?,
            user_id: parse_uuid(&self.user_id, "user_id")?,
            name: self.name,
            system_prompt: self.system_prompt,
            model: self.model,
            provider: self.provider,
            temperature: self.temperature,
            max_tokens: self.max_tokens as u32,
            is_active: self.is_active,
            created_at: parse_datetime(&self.created_at)?,
            updated_at: parse_datetime(&self.updated_at)?,
        })
    }
}

impl AgentRepository for SqliteAgentRepository {
    async fn create_agent(&self, agent: &Agent) -> Result<Agent, RepositoryError> {
        sqlx::query(
            r#"INSERT INTO agents (id, user_id, name, system_prompt, model, provider, temperature, max_tokens, is_active, created_at, updated_at)
               VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"#,
        )
        .bind(agent.id.to_string())
        .bind(agent.user_id.to_string())
        .bind(&agent.name)
        .bind(&agent.system_prompt)
        .bind(&agent.model)
        .bind(&agent.provider)
        .bind(agent.temperature)
        .bind(agent.max_tokens as i64)
        .bind(agent.is_active)
        .bind(format_datetime(&agent.created_at))
        .bind(format_datetime(&agent.updated_at))
        .execute(&self.pool.writer)
        .await
        .map_err(query_error)?;

        Ok(agent.clone())
    }

    async fn get_agent(&self, id: &Uuid) -> Result<Option<Agent>, RepositoryError> {
        let row = sqlx::query("SELECT * FROM agents WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool.reader)
            .await
            .map_err(query_error)?;

        match row {
            Some(row) => {
                let agent_row = AgentRow::from_row(&row).map_err(query_error)?;
                Ok(Some(agent_row.into_agent()?))
            }
            None => Ok(None),
        }
    }

    async fn count_agents(&self, user_id: &Uuid) -> Result<u64, RepositoryError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM agents WHERE user_id = ?")
            .bind(user_id.to_string())
            .fetch_one(&self.pool.reader)
            .await
            .map_err(query_error)?;

        Ok(count as u64)
    }
}
