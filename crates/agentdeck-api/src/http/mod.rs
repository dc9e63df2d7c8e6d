//! HTTP layer for agentdeck.
//!
//! Axum REST API at `/api/v1/` with bearer-token authentication, envelope
//! responses, and the live metrics WebSocket.

pub mod error;
pub mod extractors;
pub mod handlers;
pub mod response;
pub mod router;
