//! Bearer-credential authentication for chat and live-metrics clients.
//!
//! Token verification is a port (`TokenVerifier`) implemented in
//! agentdeck-infra; this module adds the "user must still exist" check.

use std::sync::Arc;

use uuid::Uuid;

use agentdeck_types::error::RepositoryError;
use agentdeck_types::user::User;

use crate::repository::user::UserRepository;

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("missing bearer token")]
    MissingToken,

    #[error("invalid token: {0}")]
    InvalidToken(String),

    #[error("token expired")]
    Expired,

    #[error("unknown user")]
    UnknownUser,

    #[error("storage error: {0}")]
    Store(#[from] RepositoryError),
}

/// Checks a token's signature and expiry and returns the user id it names.
pub trait TokenVerifier: Send + Sync {
    fn verify(&self, token: &str) -> Result<Uuid, AuthError>;
}

impl<T: TokenVerifier + ?Sized> TokenVerifier for Arc<T> {
    fn verify(&self, token: &str) -> Result<Uuid, AuthError> {
        (**self).verify(token)
    }
}

pub struct Authenticator<V, U> {
    verifier: V,
    users: U,
}

impl<V: TokenVerifier, U: UserRepository> Authenticator<V, U> {
    pub fn new(verifier: V, users: U) -> Self {
        Self { verifier, users }
    }

    /// Resolve a presented token (if any) to an existing user.
    pub async fn authenticate(&self, token: Option<&str>) -> Result<User, AuthError> {
        let token = token
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or(AuthError::MissingToken)?;
        let user_id = self.verifier.verify(token)?;
        self.users
            .get_user(&user_id)
            .await?
            .ok_or(AuthError::UnknownUser)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{InMemoryStore, user};

    /// Accepts tokens of the form `ok:<uuid>`.
    struct PrefixVerifier;

    impl TokenVerifier for PrefixVerifier {
        fn verify(&self, token: &str) -> Result<Uuid, AuthError> {
            match token.strip_prefix("ok:") {
                Some(id) => id.parse().map_err(|_| AuthError::InvalidToken("bad id".into())),
                None if token == "expired" => Err(AuthError::Expired),
                None => Err(AuthError::InvalidToken("bad signature".into())),
            }
        }
    }

    #[tokio::test]
    async fn test_known_user_is_authenticated() {
        let store = InMemoryStore::new();
        let id = Uuid::now_v7();
        store.insert_user(user(id));
        let auth = Authenticator::new(PrefixVerifier, store);

        let found = auth.authenticate(Some(&format!("ok:{id}"))).await.unwrap();
        assert_eq!(found.id, id);
    }

    #[tokio::test]
    async fn test_rejections() {
        let store = InMemoryStore::new();
        let auth = Authenticator::new(PrefixVerifier, store);

        assert!(matches!(auth.authenticate(None).await, Err(AuthError::MissingToken)));
        assert!(matches!(auth.authenticate(Some("  ")).await, Err(AuthError::MissingToken)));
        assert!(matches!(auth.authenticate(Some("expired")).await, Err(AuthError::Expired)));
        assert!(matches!(
            auth.authenticate(Some("forged")).await,
            Err(AuthError::InvalidToken(_))
        ));
        let ghost = format!("ok:{}", Uuid::now_v7());
        assert!(matches!(
            auth.authenticate(Some(&ghost)).await,
            Err(AuthError::UnknownUser)
        ));
    }

    #[tokio::test]
    async fn test_shared_verifier() {
        let store = InMemoryStore::new();
        let id = Uuid::now_v7();
        store.insert_user(user(id));
        let verifier = Arc::new(PrefixVerifier);
        let auth = Authenticator::new(verifier.clone(), store);

        assert!(auth.authenticate(Some(&format!("ok:{id}"))).await.is_ok());
        assert_eq!(verifier.verify(&format!("ok:{id}")).unwrap(), id);
    }
}
