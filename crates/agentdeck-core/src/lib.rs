//! Business logic and repository trait definitions for agentdeck.
//!
//! This crate defines the "ports" (repository traits, `LlmProvider`,
//! `TokenVerifier`) that the infrastructure layer implements, plus the
//! services built on them: the generation router, the chat orchestrator,
//! the metrics aggregator and the live metrics hub. It depends only on
//! `agentdeck-types` -- never on `agentdeck-infra` or any database/IO crate.

pub mod auth;
pub mod chat;
pub mod llm;
pub mod metrics;
pub mod repository;

#[cfg(test)]
pub(crate) mod test_support;
