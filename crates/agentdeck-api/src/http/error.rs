//! Application error type mapping domain failures to HTTP status codes and
//! the envelope format.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use agentdeck_core::auth::AuthError;
use agentdeck_core::chat::orchestrator::ChatError;
use agentdeck_core::metrics::aggregator::MetricsError;
use agentdeck_types::error::RepositoryError;

use crate::http::response::ApiResponse;

#[derive(Debug)]
pub enum AppError {
    Chat(ChatError),
    Metrics(MetricsError),
    Auth(AuthError),
    Validation(String),
    Internal(String),
}

impl From<ChatError> for AppError {
    fn from(e: ChatError) -> Self {
        AppError::Chat(e)
    }
}

impl From<MetricsError> for AppError {
    fn from(e: MetricsError) -> Self {
        AppError::Metrics(e)
    }
}

impl From<AuthError> for AppError {
    fn from(e: AuthError) -> Self {
        AppError::Auth(e)
    }
}

fn store_failure(e: &RepositoryError) -> (StatusCode, &'static str, String) {
    (
        StatusCode::SERVICE_UNAVAILABLE,
        "STORE_UNAVAILABLE",
        format!("Storage temporarily unavailable: {e}"),
    )
}

impl AppError {
    /// Status, machine code and message for this error.
    pub fn parts(&self) -> (StatusCode, &'static str, String) {
        match self {
            AppError::Chat(ChatError::AgentNotFound) | AppError::Metrics(MetricsError::AgentNotFound) => {
                (StatusCode::NOT_FOUND, "AGENT_NOT_FOUND", "Agent not found".to_string())
            }
            AppError::Chat(ChatError::ConversationNotFound) => (
                StatusCode::NOT_FOUND,
                "CONVERSATION_NOT_FOUND",
                "Conversation not found".to_string(),
            ),
            AppError::Chat(ChatError::AgentInactive) => (
                StatusCode::FORBIDDEN,
                "AGENT_INACTIVE",
                "Agent is inactive".to_string(),
            ),
            AppError::Chat(ChatError::EmptyMessage) => (
                StatusCode::BAD_REQUEST,
                "VALIDATION_ERROR",
                "Message must not be empty".to_string(),
            ),
            AppError::Chat(ChatError::UnsupportedProvider(tag)) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "UNSUPPORTED_PROVIDER",
                format!("No provider available for '{tag}'"),
            ),
            AppError::Chat(ChatError::Generation(e)) => (
                StatusCode::from_u16(e.status_hint()).unwrap_or(StatusCode::BAD_GATEWAY),
                e.code(),
                e.to_string(),
            ),
            AppError::Chat(ChatError::Store(e)) | AppError::Metrics(MetricsError::Store(e)) => {
                store_failure(e)
            }
            AppError::Auth(AuthError::Store(e)) => store_failure(e),
            AppError::Auth(AuthError::Expired) => {
                (StatusCode::UNAUTHORIZED, "TOKEN_EXPIRED", "Token expired".to_string())
            }
            AppError::Auth(e) => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED", e.to_string()),
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone()),
            AppError::Internal(msg) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR", msg.clone())
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = self.parts();
        if status.is_server_error() {
            tracing::error!(code, %message, "request failed");
        }
        let body = ApiResponse::error(code, &message, uuid::Uuid::now_v7().to_string());
        (status, body).into_response()
    }
}
