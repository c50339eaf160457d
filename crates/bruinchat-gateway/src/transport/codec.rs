//! Decode-once codec for the transport layer.
//!
//! - Text frames => `InboundEnvelope` (size-checked before parsing)
//! - Binary frames are not part of the chat protocol and decode to an error
//! - Ping/Pong/Close are surfaced for lifecycle management

use axum::extract::ws::Message;
use bruinchat_core::{
    error::{ChatError, Result},
    protocol::InboundEnvelope,
};

#[derive(Debug)]
pub enum Inbound {
    Text { env: InboundEnvelope, bytes_len: usize },
    Ping,
    Pong,
    Close,
}

pub fn decode(msg: Message, max_frame_bytes: usize) -> Result<Inbound> {
    match msg {
        Message::Text(s) => {
            let bytes_len = s.len();
            if bytes_len > max_frame_bytes {
                return Err(ChatError::PayloadTooLarge {
                    len: bytes_len,
                    max: max_frame_bytes,
                });
            }
            let env = InboundEnvelope::parse(&s)?;
            Ok(Inbound::Text { env, bytes_len })
        }
        Message::Binary(b) => Err(ChatError::BadRequest(format!(
            "binary frames are not supported ({} bytes)",
            b.len()
        ))),
        Message::Ping(_) => Ok(Inbound::Ping),
        Message::Pong(_) => Ok(Inbound::Pong),
        Message::Close(_) => Ok(Inbound::Close),
    }
}

/// Metric label for a decode failure.
pub fn error_reason(e: &ChatError) -> &'static str {
    match e {
        ChatError::PayloadTooLarge { .. } => "too_large",
        ChatError::BadRequest(m) if m.starts_with("binary") => "binary",
        _ => "json",
    }
}
