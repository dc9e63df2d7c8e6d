//! Conversation orchestration: one chat turn from user message to stored
//! assistant reply and metric record.

pub mod orchestrator;
