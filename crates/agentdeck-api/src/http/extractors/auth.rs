//! Bearer-token authentication extractor.
//!
//! Reads `Authorization: Bearer <token>`, verifies it and loads the user it
//! names.

use axum::extract::FromRequestParts;
use axum::http::HeaderMap;
use axum::http::request::Parts;

use agentdeck_core::auth::AuthError;
use agentdeck_types::user::User;

use crate::http::error::AppError;
use crate::state::AppState;

/// The authenticated caller. Extracting this validates the bearer token.
pub struct AuthUser(pub User);

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = bearer_token(&parts.headers)?;
        let user = state.authenticator.authenticate(token.as_deref()).await?;
        Ok(AuthUser(user))
    }
}

/// Token from the `Authorization` header, if one is present.
pub fn bearer_token(headers: &HeaderMap) -> Result<Option<String>, AppError> {
    let Some(value) = headers.get(axum::http::header::AUTHORIZATION) else {
        return Ok(None);
    };
    let value = value
        .to_str()
        .map_err(|_| AppError::Auth(AuthError::InvalidToken("invalid header encoding".to_string())))?;
    match value.strip_prefix("Bearer ") {
        Some(token) => Ok(Some(token.trim().to_string())),
        None => Err(AppError::Auth(AuthError::InvalidToken(
            "expected 'Authorization: Bearer <token>'".to_string(),
        ))),
    }
}
