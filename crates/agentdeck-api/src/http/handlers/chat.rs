//! Chat turn handler.

use std::time::Instant;

use axum::Json;
use axum::extract::{Path, State};
use serde::Deserialize;
use uuid::Uuid;

use agentdeck_core::chat::orchestrator::{TurnOutcome, TurnRequest};

use crate::http::error::AppError;
use crate::http::extractors::auth::AuthUser;
use crate::http::response::ApiResponse;
use crate::state::AppState;

/// Longest accepted chat message, in characters.
pub const MAX_MESSAGE_CHARS: usize = 10_000;

#[derive(Debug, Deserialize)]
pub struct ChatBody {
    pub message: String,
    #[serde(default, alias = "conversationId")]
    pub conversation_id: Option<Uuid>,
}

impl ChatBody {
    fn validate(&self) -> Result<(), AppError> {
        if self.message.trim().is_empty() {
            return Err(AppError::Validation("message must not be empty".to_string()));
        }
        if self.message.chars().count() > MAX_MESSAGE_CHARS {
            return Err(AppError::Validation(format!(
                "message exceeds {MAX_MESSAGE_CHARS} characters"
            )));
        }
        Ok(())
    }
}

/// POST /api/v1/agents/{agent_id}/chat - Run one chat turn.
pub async fn send_message(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(agent_id): Path<Uuid>,
    Json(body): Json<ChatBody>,
) -> Result<ApiResponse<TurnOutcome>, AppError> {
    let start = Instant::now();
    let request_id = Uuid::now_v7().to_string();

    body.validate()?;

    let outcome = state
        .orchestrator
        .handle_turn(TurnRequest {
            user_id: user.id,
            agent_id,
            message: body.message,
            conversation_id: body.conversation_id,
        })
        .await?;

    let elapsed = start.elapsed().as_millis() as u64;
    Ok(ApiResponse::success(outcome, request_id, elapsed))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    use crate::http::router::build_router;
    use crate::state::test_support::{bearer, seed_agent, seed_user, test_state};

    fn body(message: &str) -> ChatBody {
        ChatBody {
            message: message.to_string(),
            conversation_id: None,
        }
    }

    #[test]
    fn validate_rejects_blank_and_oversized() {
        assert!(body("hello").validate().is_ok());
        assert!(body("   ").validate().is_err());
        assert!(body(&"x".repeat(MAX_MESSAGE_CHARS)).validate().is_ok());
        assert!(body(&"x".repeat(MAX_MESSAGE_CHARS + 1)).validate().is_err());
    }

    #[test]
    fn body_accepts_camel_case_conversation_id() {
        let id = Uuid::now_v7();
        let parsed: ChatBody =
            serde_json::from_value(serde_json::json!({"message": "hi", "conversationId": id}))
                .unwrap();
        assert_eq!(parsed.conversation_id, Some(id));
    }

    fn chat_request(agent_id: Uuid, auth: Option<String>, json: &str) -> Request<Body> {
        let mut builder = Request::post(format!("/api/v1/agents/{agent_id}/chat"))
            .header("content-type", "application/json");
        if let Some(auth) = auth {
            builder = builder.header("authorization", auth);
        }
        builder.body(Body::from(json.to_string())).unwrap()
    }

    #[tokio::test]
    async fn chat_requires_token() {
        let (state, _dir) = test_state().await;
        let router = build_router(state);
        let resp = router
            .oneshot(chat_request(Uuid::now_v7(), None, r#"{"message":"hi"}"#))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn chat_with_unknown_agent_is_404() {
        let (state, _dir) = test_state().await;
        let user = seed_user(&state).await;
        let auth = bearer(&state, user.id);
        let router = build_router(state);
        let resp = router
            .oneshot(chat_request(Uuid::now_v7(), Some(auth), r#"{"message":"hi"}"#))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn chat_without_registered_provider_fails_closed() {
        let (state, _dir) = test_state().await;
        let user = seed_user(&state).await;
        let agent = seed_agent(&state, user.id).await;
        let auth = bearer(&state, user.id);
        let router = build_router(state);
        let resp = router
            .oneshot(chat_request(agent.id, Some(auth), r#"{"message":"hi"}"#))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(json["errors"][0]["code"], "UNSUPPORTED_PROVIDER");
    }

    #[tokio::test]
    async fn chat_rejects_blank_message() {
        let (state, _dir) = test_state().await;
        let user = seed_user(&state).await;
        let agent = seed_agent(&state, user.id).await;
        let auth = bearer(&state, user.id);
        let router = build_router(state);
        let resp = router
            .oneshot(chat_request(agent.id, Some(auth), r#"{"message":"   "}"#))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }
}
