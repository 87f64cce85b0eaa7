pub mod accounts;
pub mod verifier;

pub use accounts::{AccountStore, PgAccountStore};
pub use verifier::{AccessGate, CredentialVerifier};

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::Role;

/// Token payload. `role` is informational only; privilege is always re-read from storage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    pub exp: i64,
    pub iat: i64,
}

impl Claims {
    pub fn new(user_id: i64, role: Option<Role>, ttl: Duration) -> Self {
        let now = Utc::now();
        Self {
            sub: user_id.to_string(),
            role: role.map(|r| r.as_str().to_string()),
            exp: (now + ttl).timestamp(),
            iat: now.timestamp(),
        }
    }

    /// Numeric subject identity
    pub fn subject_id(&self) -> Result<i64, TokenError> {
        self.sub
            .parse::<i64>()
            .map_err(|_| TokenError::Invalid("subject claim is not a user id".to_string()))
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum TokenError {
    #[error("Token has expired")]
    Expired,

    #[error("Invalid token: {0}")]
    Invalid(String),

    #[error("Token signing secret is not configured")]
    MissingSecret,

    #[error("Token generation failed: {0}")]
    Generation(String),
}

pub fn generate_jwt(secret: &str, claims: &Claims) -> Result<String, TokenError> {
    if secret.is_empty() {
        return Err(TokenError::MissingSecret);
    }

    let encoding_key = EncodingKey::from_secret(secret.as_bytes());
    encode(&Header::new(Algorithm::HS256), claims, &encoding_key)
        .map_err(|e| TokenError::Generation(e.to_string()))
}

/// Verify signature and validity window, then decode the claims
pub fn decode_jwt(secret: &str, token: &str) -> Result<Claims, TokenError> {
    if secret.is_empty() {
        return Err(TokenError::MissingSecret);
    }

    let decoding_key = DecodingKey::from_secret(secret.as_bytes());
    let mut validation = Validation::new(Algorithm::HS256);
    validation.set_required_spec_claims(&["exp", "sub"]);

    decode::<Claims>(token, &decoding_key, &validation)
        .map(|data| data.claims)
        .map_err(|e| match e.kind() {
            ErrorKind::ExpiredSignature => TokenError::Expired,
            _ => TokenError::Invalid(e.to_string()),
        })
}
