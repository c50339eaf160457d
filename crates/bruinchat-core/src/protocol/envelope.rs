//! Chat envelopes (JSON text frames).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{ChatError, Result};
use crate::protocol::id::Id;

/// Envelope type that triggers persistence and fan-out.
pub const MESSAGE_TYPE: &str = "message";

/// Inbound envelope as sent by clients.
///
/// Every field except `type` is optional at this stage; [`InboundEnvelope::into_chat`]
/// decides whether a `"message"` envelope is complete.
#[derive(Debug, Deserialize)]
pub struct InboundEnvelope {
    /// Discriminator (field name is `type` in JSON).
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub conversation_id: Option<Id>,
    #[serde(default)]
    pub sender_id: Option<Id>,
    #[serde(default)]
    pub receiver_id: Option<Id>,
    #[serde(default)]
    pub content: Option<String>,
}

impl InboundEnvelope {
    pub fn parse(text: &str) -> Result<Self> {
        serde_json::from_str(text)
            .map_err(|e| ChatError::BadRequest(format!("invalid envelope json: {e}")))
    }

    pub fn is_message(&self) -> bool {
        self.kind == MESSAGE_TYPE
    }

    /// Validate a `"message"` envelope sent by `authenticated_user`.
    ///
    /// Returns `Ok(None)` for any other envelope type. The authenticated user
    /// is authoritative: a `sender_id` naming someone else is rejected, and a
    /// missing one is filled in.
    pub fn into_chat(self, authenticated_user: &str) -> Result<Option<ChatFrame>> {
        if !self.is_message() {
            return Ok(None);
        }

        let conversation_id = required(self.conversation_id, "conversation_id")?;
        let receiver_id = required(self.receiver_id, "receiver_id")?;

        let sender_id = match self.sender_id {
            Some(id) if id.key() == authenticated_user => id,
            Some(id) => {
                return Err(ChatError::BadRequest(format!(
                    "sender_id {id} does not match authenticated user"
                )))
            }
            None => Id::from(authenticated_user),
        };

        let content = self
            .content
            .filter(|c| !c.trim().is_empty())
            .ok_or_else(|| ChatError::BadRequest("message requires non-empty content".into()))?;

        Ok(Some(ChatFrame {
            conversation_id,
            sender_id,
            receiver_id,
            content,
        }))
    }
}

fn required(id: Option<Id>, field: &'static str) -> Result<Id> {
    match id {
        Some(id) if !id.is_blank() => Ok(id),
        _ => Err(ChatError::BadRequest(format!("message requires {field}"))),
    }
}

/// Validated chat message, not yet persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatFrame {
    pub conversation_id: Id,
    pub sender_id: Id,
    pub receiver_id: Id,
    pub content: String,
}

/// Confirmed message as delivered to sender and receiver.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutboundMessage {
    #[serde(rename = "type")]
    pub kind: String,
    pub message_id: i64,
    pub conversation_id: Id,
    pub sender_id: Id,
    pub receiver_id: Id,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

impl OutboundMessage {
    /// Stamp a validated frame with its storage-assigned id and timestamp.
    pub fn confirmed(frame: ChatFrame, message_id: i64, created_at: DateTime<Utc>) -> Self {
        Self {
            kind: MESSAGE_TYPE.to_string(),
            message_id,
            conversation_id: frame.conversation_id,
            sender_id: frame.sender_id,
            receiver_id: frame.receiver_id,
            content: frame.content,
            created_at,
        }
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self)
            .map_err(|e| ChatError::Internal(format!("json encode failed: {e}")))
    }
}
