//! Session token verification.
//!
//! The backend signs session tokens with a shared HMAC secret. The gateway
//! only checks signature, `exp`/`nbf` (with a 30 second leeway) and reads an
//! optional `role` claim; every other claim is carried through untouched.

use jsonwebtoken::{decode, errors::ErrorKind, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::error::SessionError;

/// Clock-skew tolerance applied to `exp` and `nbf`.
pub const CLOCK_SKEW_SECS: u64 = 30;

/// Claims the gateway cares about. Unknown claims are kept in `extra`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Claims {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exp: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nbf: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iat: Option<u64>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Verifies session tokens against the shared secret.
#[derive(Clone)]
pub struct SessionVerifier {
    key: Arc<DecodingKey>,
    validation: Validation,
}

impl SessionVerifier {
    pub fn new(secret: &str) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.algorithms = vec![Algorithm::HS256, Algorithm::HS384, Algorithm::HS512];
        validation.leeway = CLOCK_SKEW_SECS;
        validation.validate_exp = true;
        validation.validate_nbf = true;
        validation.validate_aud = false;
        // `exp` is checked when present but not demanded.
        validation.required_spec_claims.clear();

        Self {
            key: Arc::new(DecodingKey::from_secret(secret.as_bytes())),
            validation,
        }
    }

    pub fn verify(&self, token: &str) -> Result<Claims, SessionError> {
        if token.is_empty() {
            return Err(SessionError::Missing);
        }
        decode::<Claims>(token, &self.key, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| {
                tracing::debug!("session token rejected: {e}");
                match e.kind() {
                    ErrorKind::ExpiredSignature => SessionError::Expired,
                    ErrorKind::ImmatureSignature => SessionError::Immature,
                    _ => SessionError::Invalid(e.to_string()),
                }
            })
    }

    /// `verify`, collapsed to "authenticated or not".
    pub fn authenticate(&self, token: Option<&str>) -> Option<Claims> {
        token.and_then(|t| self.verify(t).ok())
    }
}

#[cfg(test)]
pub(crate) mod test_tokens {
    use jsonwebtoken::{encode, EncodingKey, Header};

    pub fn now() -> u64 {
        chrono::Utc::now().timestamp() as u64
    }

    pub fn sign(secret: &str, claims: serde_json::Value) -> String {
        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .unwrap()
    }
}
