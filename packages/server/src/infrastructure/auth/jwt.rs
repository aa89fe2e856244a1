//! JWT token authentication.
//!
//! Tokens are HS256 JWTs carrying `{ "userId": ..., "role": ... }`, the shape
//! the account service issues at sign-in. `exp` is honoured when present.

use std::time::Duration;

use async_trait::async_trait;
use jsonwebtoken::{
    Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode,
    get_current_timestamp,
};
use serde::{Deserialize, Serialize};

use crate::domain::{AuthError, TokenAuthenticator, UserId};

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    #[serde(rename = "userId")]
    user_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    exp: Option<u64>,
}

pub struct JwtTokenAuthenticator {
    key: DecodingKey,
    validation: Validation,
}

impl JwtTokenAuthenticator {
    pub fn new(secret: &[u8]) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.required_spec_claims.clear();
        validation.validate_aud = false;
        Self {
            key: DecodingKey::from_secret(secret),
            validation,
        }
    }
}

#[async_trait]
impl TokenAuthenticator for JwtTokenAuthenticator {
    async fn authenticate(&self, token: &str) -> Result<UserId, AuthError> {
        let token = token.trim();
        let token = token.strip_prefix("Bearer ").unwrap_or(token).trim();
        if token.is_empty() {
            return Err(AuthError::MissingToken);
        }

        let data = decode::<Claims>(token, &self.key, &self.validation)
            .map_err(|e| AuthError::InvalidToken(e.to_string()))?;
        UserId::new(data.claims.user_id).map_err(|e| AuthError::InvalidToken(e.to_string()))
    }
}

/// Mint a token the authenticator accepts. `ttl: None` issues a non-expiring token.
pub fn issue_token(
    secret: &[u8],
    user_id: &UserId,
    role: Option<&str>,
    ttl: Option<Duration>,
) -> Result<String, AuthError> {
    let claims = Claims {
        user_id: user_id.as_str().to_string(),
        role: role.map(str::to_string),
        exp: ttl.map(|ttl| get_current_timestamp() + ttl.as_secs()),
    };
    encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(secret),
    )
    .map_err(|e| AuthError::InvalidToken(e.to_string()))
}
