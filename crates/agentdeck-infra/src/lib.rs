//! Infrastructure layer for agentdeck.
//!
//! Implementations of the ports defined in `agentdeck-core`: SQLite
//! repositories, the OpenAI and Gemini provider adapters, the HS256 token
//! codec, and the `config.toml` loader.

pub mod auth;
pub mod config;
pub mod llm;
pub mod sqlite;
