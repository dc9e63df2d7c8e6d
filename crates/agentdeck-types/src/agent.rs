//! Agent configuration types.
//!
//! An agent binds a system prompt to a provider/model pair and the sampling
//! parameters used for every chat turn against it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::llm::ProviderKind;

pub const MIN_TEMPERATURE: f64 = 0.0;
pub const MAX_TEMPERATURE: f64 = 2.0;
pub const MIN_MAX_TOKENS: u32 = 100;
pub const MAX_MAX_TOKENS: u32 = 8000;

/// A user-owned agent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Agent {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub system_prompt: String,
    pub model: String,
    /// Provider tag as stored. An empty tag means "use the configured default".
    pub provider: String,
    pub temperature: f64,
    pub max_tokens: u32,
    /// Inactive agents keep their history but refuse new turns.
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for creating an agent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewAgent {
    pub user_id: Uuid,
    pub name: String,
    pub system_prompt: String,
    pub provider: ProviderKind,
    /// Falls back to the provider's default model when absent.
    pub model: Option<String>,
    pub temperature: f64,
    pub max_tokens: u32,
}

#[derive(Debug, Error, PartialEq)]
pub enum AgentValidationError {
    #[error("agent name must not be empty")]
    EmptyName,

    #[error("system prompt must not be empty")]
    EmptySystemPrompt,

    #[error("temperature {0} is outside 0.0..=2.0")]
    Temperature(f64),

    #[error("max tokens {0} is outside 100..=8000")]
    MaxTokens(u32),

    #[error("model '{model}' is not served by provider '{provider}'")]
    UnsupportedModel { provider: ProviderKind, model: String },
}

impl NewAgent {
    /// Check field ranges and return the agent to persist.
    pub fn validate(self, now: DateTime<Utc>) -> Result<Agent, AgentValidationError> {
        let name = self.name.trim().to_string();
        if name.is_empty() {
            return Err(AgentValidationError::EmptyName);
        }
        if self.system_prompt.trim().is_empty() {
            return Err(AgentValidationError::EmptySystemPrompt);
        }
        if !(MIN_TEMPERATURE..=MAX_TEMPERATURE).contains(&self.temperature) {
            return Err(AgentValidationError::Temperature(self.temperature));
        }
        if !(MIN_MAX_TOKENS..=MAX_MAX_TOKENS).contains(&self.max_tokens) {
            return Err(AgentValidationError::MaxTokens(self.max_tokens));
        }

        let model = match self.model {
            Some(m) if !m.trim().is_empty() => m.trim().to_string(),
            _ => self.provider.default_model().to_string(),
        };
        if !self.provider.supports_model(&model) {
            return Err(AgentValidationError::UnsupportedModel {
                provider: self.provider,
                model,
            });
        }

        Ok(Agent {
            id: Uuid::now_v7(),
            user_id: self.user_id,
            name,
            system_prompt: self.system_prompt,
            model,
            provider: self.provider.to_string(),
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            is_active: true,
            created_at: now,
            updated_at: now,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draft() -> NewAgent {
        NewAgent {
            user_id: Uuid::now_v7(),
            name: "  Support Bot ".to_string(),
            system_prompt: "You answer support tickets.".to_string(),
            provider: ProviderKind::Gemini,
            model: None,
            temperature: 0.7,
            max_tokens: 1000,
        }
    }

    #[test]
    fn test_validate_fills_default_model() {
        let agent = draft().validate(Utc::now()).unwrap();
        assert_eq!(agent.name, "Support Bot");
        assert_eq!(agent.model, "gemini-2.5-flash");
        assert_eq!(agent.provider, "gemini");
        assert!(agent.is_active);
    }

    #[test]
    fn test_validate_bounds_are_inclusive() {
        let mut d = draft();
        d.temperature = 2.0;
        d.max_tokens = 8000;
        assert!(d.validate(Utc::now()).is_ok());

        let mut d = draft();
        d.temperature = 0.0;
        d.max_tokens = 100;
        assert!(d.validate(Utc::now()).is_ok());
    }

    #[test]
    fn test_validate_rejects_out_of_range() {
        let mut d = draft();
        d.temperature = 2.1;
        assert_eq!(
            d.validate(Utc::now()).unwrap_err(),
            AgentValidationError::Temperature(2.1)
        );

        let mut d = draft();
        d.max_tokens = 99;
        assert_eq!(
            d.validate(Utc::now()).unwrap_err(),
            AgentValidationError::MaxTokens(99)
        );
    }

    #[test]
    fn test_validate_rejects_mismatched_model() {
        let mut d = draft();
        d.model = Some("gpt-4o".to_string());
        assert!(matches!(
            d.validate(Utc::now()),
            Err(AgentValidationError::UnsupportedModel { .. })
        ));
    }
}
