use std::sync::Arc;

use axum::extract::ws::Message;
use serde_json::Value;

use bruinchat_core::error::{ChatError, Result};

/// Serialized text frame sitting in a session's outbound queue.
///
/// Encoded once and shared by every recipient (sender echo + receiver), so a
/// clone is a refcount bump.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreparedMsg(Arc<str>);

impl PreparedMsg {
    pub fn text(s: impl Into<Arc<str>>) -> Self {
        Self(s.into())
    }

    pub fn json(v: &Value) -> Result<Self> {
        let s = serde_json::to_string(v)
            .map_err(|e| ChatError::BadRequest(format!("json encode failed: {e}")))?;
        Ok(Self::text(s))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_ws_message(self) -> Message {
        Message::Text(self.0.to_string())
    }
}
