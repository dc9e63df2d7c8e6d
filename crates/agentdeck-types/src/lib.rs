//! Shared domain types for agentdeck.
//!
//! This crate contains the values passed between the chat orchestrator,
//! the metrics services and their storage and provider adapters: agents,
//! conversations, messages, metric records, live-channel events, LLM
//! request/response shapes, and configuration.
//!
//! Zero infrastructure dependencies -- only serde, uuid, chrono, thiserror.

pub mod agent;
pub mod chat;
pub mod config;
pub mod error;
pub mod hub;
pub mod llm;
pub mod metrics;
pub mod user;
