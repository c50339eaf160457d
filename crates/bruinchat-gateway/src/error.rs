//! HTTP mapping for gateway errors.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use bruinchat_core::error::ChatError;

/// Wraps a [`ChatError`] returned from an HTTP handler.
#[derive(Debug)]
pub struct HttpError(pub ChatError);

impl From<ChatError> for HttpError {
    fn from(e: ChatError) -> Self {
        Self(e)
    }
}

impl HttpError {
    pub fn status(&self) -> StatusCode {
        match &self.0 {
            ChatError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ChatError::AuthFailed => StatusCode::UNAUTHORIZED,
            ChatError::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            ChatError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            ChatError::Storage(_) | ChatError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = Json(json!({
            "error": self.0.client_code().as_str(),
            "message": self.0.to_string(),
        }));
        (status, body).into_response()
    }
}
