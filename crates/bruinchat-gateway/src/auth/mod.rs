//! Token verification at the WebSocket upgrade.
//!
//! Tokens are HS256 JWTs issued by the account service at login. A request
//! whose token fails verification is rejected before any session exists.

use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};

use bruinchat_core::error::{ChatError, Result};

/// Claims carried by account-service tokens.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub user_id: String,
    #[serde(default)]
    pub email: String,
    pub exp: i64,
    #[serde(default)]
    pub iat: i64,
}

pub trait TokenVerifier: Send + Sync {
    /// Resolve a bearer token to its claims or fail with `AuthFailed`.
    fn verify(&self, token: &str) -> Result<Claims>;
}

pub struct JwtVerifier {
    key: DecodingKey,
    validation: Validation,
}

impl JwtVerifier {
    pub fn new(secret: &[u8]) -> Self {
        Self {
            key: DecodingKey::from_secret(secret),
            validation: Validation::new(Algorithm::HS256),
        }
    }

    /// Build from the secret stored in environment variable `var`.
    pub fn from_env(var: &str) -> Result<Self> {
        let secret = std::env::var(var)
            .map_err(|_| ChatError::Internal(format!("environment variable {var} is not set")))?;
        if secret.is_empty() {
            return Err(ChatError::Internal(format!("environment variable {var} is empty")));
        }
        Ok(Self::new(secret.as_bytes()))
    }
}

impl TokenVerifier for JwtVerifier {
    fn verify(&self, token: &str) -> Result<Claims> {
        if token.is_empty() {
            return Err(ChatError::AuthFailed);
        }
        let data = decode::<Claims>(token, &self.key, &self.validation).map_err(|e| {
            tracing::debug!(error = %e, "token rejected");
            ChatError::AuthFailed
        })?;

        if data.claims.user_id.trim().is_empty() {
            return Err(ChatError::AuthFailed);
        }
        Ok(data.claims)
    }
}
