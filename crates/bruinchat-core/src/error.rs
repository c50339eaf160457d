//! Shared error type across bruinchat crates.

use thiserror::Error;

/// Client-facing error codes (stable API).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientCode {
    /// Invalid input / malformed message.
    BadRequest,
    /// Missing, invalid or expired token.
    AuthFailed,
    /// Frame exceeds the configured size limit.
    PayloadTooLarge,
    /// Server is draining or the peer is not reachable.
    Unavailable,
    /// Persistence collaborator failed.
    Storage,
    /// Internal server error.
    Internal,
}

impl ClientCode {
    /// String representation used in JSON responses.
    pub fn as_str(self) -> &'static str {
        match self {
            ClientCode::BadRequest => "BAD_REQUEST",
            ClientCode::AuthFailed => "AUTH_FAILED",
            ClientCode::PayloadTooLarge => "PAYLOAD_TOO_LARGE",
            ClientCode::Unavailable => "UNAVAILABLE",
            ClientCode::Storage => "STORAGE",
            ClientCode::Internal => "INTERNAL",
        }
    }
}

/// Shared result type.
pub type Result<T> = std::result::Result<T, ChatError>;

/// Unified error type used by core and gateway.
#[derive(Debug, Error)]
pub enum ChatError {
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("auth failed")]
    AuthFailed,
    #[error("payload too large: {len} > {max} bytes")]
    PayloadTooLarge { len: usize, max: usize },
    #[error("unavailable: {0}")]
    Unavailable(String),
    #[error("storage: {0}")]
    Storage(String),
    #[error("internal: {0}")]
    Internal(String),
}

impl ChatError {
    /// Map internal error to a stable client-facing code.
    pub fn client_code(&self) -> ClientCode {
        match self {
            ChatError::BadRequest(_) => ClientCode::BadRequest,
            ChatError::AuthFailed => ClientCode::AuthFailed,
            ChatError::PayloadTooLarge { .. } => ClientCode::PayloadTooLarge,
            ChatError::Unavailable(_) => ClientCode::Unavailable,
            ChatError::Storage(_) => ClientCode::Storage,
            ChatError::Internal(_) => ClientCode::Internal,
        }
    }
}
