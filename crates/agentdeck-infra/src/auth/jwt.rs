//! HS256 JSON Web Tokens.
//!
//! Tokens carry `{ "userId": <uuid>, "iat": <secs>, "exp": <secs> }` and are
//! signed with HMAC-SHA256 over `base64url(header).base64url(claims)`.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, Duration, Utc};
use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use uuid::Uuid;

use agentdeck_core::auth::{AuthError, TokenVerifier};

type HmacSha256 = Hmac<Sha256>;

/// Environment variable holding the signing secret.
pub const JWT_SECRET_ENV: &str = "AGENTDECK_JWT_SECRET";

#[derive(Debug, Serialize, Deserialize)]
struct Header {
    alg: String,
    typ: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Claims {
    user_id: Uuid,
    #[serde(default)]
    iat: i64,
    exp: i64,
}

/// Issues and verifies HS256 tokens with a shared secret.
///
/// Does not derive Debug; the secret must never be printed.
pub struct JwtCodec {
    secret: SecretString,
}

impl JwtCodec {
    pub fn new(secret: SecretString) -> Self {
        Self { secret }
    }

    fn mac(&self) -> Result<HmacSha256, AuthError> {
        HmacSha256::new_from_slice(self.secret.expose_secret().as_bytes())
            .map_err(|e| AuthError::InvalidToken(format!("bad signing key: {e}")))
    }

    /// Sign a token for `user_id` valid for `ttl`.
    pub fn issue(&self, user_id: Uuid, ttl: Duration) -> Result<String, AuthError> {
        self.issue_at(user_id, ttl, Utc::now())
    }

    pub fn issue_at(
        &self,
        user_id: Uuid,
        ttl: Duration,
        now: DateTime<Utc>,
    ) -> Result<String, AuthError> {
        let header = Header {
            alg: "HS256".to_string(),
            typ: "JWT".to_string(),
        };
        let claims = Claims {
            user_id,
            iat: now.timestamp(),
            exp: (now + ttl).timestamp(),
        };

        let header = encode_json(&header)?;
        let claims = encode_json(&claims)?;
        let signing_input = format!("{header}.{claims}");

        let mut mac = self.mac()?;
        mac.update(signing_input.as_bytes());
        let signature = URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes());

        Ok(format!("{signing_input}.{signature}"))
    }

    /// Verify signature and expiry against an explicit clock reading.
    pub fn verify_at(&self, token: &str, now: DateTime<Utc>) -> Result<Uuid, AuthError> {
        let mut parts = token.split('.');
        let (Some(header_b64), Some(claims_b64), Some(signature_b64), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(AuthError::InvalidToken("malformed token".to_string()));
        };

        let header: Header = decode_json(header_b64)?;
        if header.alg != "HS256" {
            return Err(AuthError::InvalidToken(format!(
                "unsupported algorithm '{}'",
                header.alg
            )));
        }

        let signature = URL_SAFE_NO_PAD
            .decode(signature_b64)
            .map_err(|_| AuthError::InvalidToken("malformed signature".to_string()))?;
        let mut mac = self.mac()?;
        mac.update(format!("{header_b64}.{claims_b64}").as_bytes());
        // Constant-time comparison.
        mac.verify_slice(&signature)
            .map_err(|_| AuthError::InvalidToken("signature mismatch".to_string()))?;

        let claims: Claims = decode_json(claims_b64)?;
        if claims.exp <= now.timestamp() {
            return Err(AuthError::Expired);
        }
        Ok(claims.user_id)
    }
}

impl TokenVerifier for JwtCodec {
    fn verify(&self, token: &str) -> Result<Uuid, AuthError> {
        self.verify_at(token, Utc::now())
    }
}

fn encode_json<T: Serialize>(value: &T) -> Result<String, AuthError> {
    let json = serde_json::to_vec(value)
        .map_err(|e| AuthError::InvalidToken(format!("failed to encode token: {e}")))?;
    Ok(URL_SAFE_NO_PAD.encode(json))
}

fn decode_json<T: for<'de> Deserialize<'de>>(segment: &str) -> Result<T, AuthError> {
    let bytes = URL_SAFE_NO_PAD
        .decode(segment)
        .map_err(|_| AuthError::InvalidToken("malformed token segment".to_string()))?;
    serde_json::from_slice(&bytes)
        .map_err(|_| AuthError::InvalidToken("malformed token segment".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn codec(secret: &str) -> JwtCodec {
        JwtCodec::new(SecretString::from(secret.to_string()))
    }

    #[test]
    fn test_issue_then_verify() {
        let codec = codec("top-secret");
        let user_id = Uuid::now_v7();
        let token = codec.issue(user_id, Duration::hours(1)).unwrap();
        assert_eq!(token.split('.').count(), 3);
        assert_eq!(codec.verify(&token).unwrap(), user_id);
    }

    #[test]
    fn test_claims_use_user_id_key() {
        let codec = codec("top-secret");
        let token = codec.issue(Uuid::now_v7(), Duration::hours(1)).unwrap();
        let claims = token.split('.').nth(1).unwrap();
        let json: serde_json::Value =
            serde_json::from_slice(&URL_SAFE_NO_PAD.decode(claims).unwrap()).unwrap();
        assert!(json.get("userId").is_some());
        assert!(json.get("exp").is_some());
    }

    #[test]
    fn test_expired_token_rejected() {
        let codec = codec("top-secret");
        let issued = Utc::now() - Duration::hours(2);
        let token = codec
            .issue_at(Uuid::now_v7(), Duration::hours(1), issued)
            .unwrap();
        assert!(matches!(codec.verify(&token), Err(AuthError::Expired)));
        assert!(codec.verify_at(&token, issued + Duration::minutes(30)).is_ok());
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let token = codec("one").issue(Uuid::now_v7(), Duration::hours(1)).unwrap();
        assert!(matches!(
            codec("two").verify(&token),
            Err(AuthError::InvalidToken(_))
        ));
    }

    #[test]
    fn test_tampered_claims_rejected() {
        let codec = codec("top-secret");
        let token = codec.issue(Uuid::now_v7(), Duration::hours(1)).unwrap();
        let parts: Vec<&str> = token.split('.').collect();
        let forged_claims = encode_json(&Claims {
            user_id: Uuid::now_v7(),
            iat: 0,
            exp: i64::MAX,
        })
        .unwrap();
        let forged = format!("{}.{}.{}", parts[0], forged_claims, parts[2]);
        assert!(matches!(codec.verify(&forged), Err(AuthError::InvalidToken(_))));
    }

    #[test]
    fn test_malformed_tokens_rejected() {
        let codec = codec("top-secret");
        for token in ["", "abc", "a.b", "a.b.c.d", "!!.??.##"] {
            assert!(
                matches!(codec.verify(token), Err(AuthError::InvalidToken(_))),
                "token {token:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_none_algorithm_rejected() {
        let codec = codec("top-secret");
        let header = encode_json(&Header {
            alg: "none".to_string(),
            typ: "JWT".to_string(),
        })
        .unwrap();
        let claims = encode_json(&Claims {
            user_id: Uuid::now_v7(),
            iat: 0,
            exp: i64::MAX,
        })
        .unwrap();
        let token = format!("{header}.{claims}.");
        assert!(matches!(codec.verify(&token), Err(AuthError::InvalidToken(_))));
    }
}
