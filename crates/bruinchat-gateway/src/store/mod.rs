//! Message persistence collaborator.
//!
//! The chat path calls [`MessageStore::save_message`] exactly once per inbound
//! message frame and never retries. [`MessageStore::touch_conversation`] is a
//! best-effort side update whose failure is only logged.

mod memory;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use bruinchat_core::error::Result;
use bruinchat_core::protocol::{ChatFrame, Id};

pub use memory::{ConversationSummary, InMemoryMessageStore};

/// Message as handed to the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewMessage {
    pub conversation_id: Id,
    pub sender_id: Id,
    pub receiver_id: Id,
    pub content: String,
}

impl From<&ChatFrame> for NewMessage {
    fn from(frame: &ChatFrame) -> Self {
        Self {
            conversation_id: frame.conversation_id.clone(),
            sender_id: frame.sender_id.clone(),
            receiver_id: frame.receiver_id.clone(),
            content: frame.content.clone(),
        }
    }
}

/// Message after the store assigned its id and timestamp.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredMessage {
    pub message_id: i64,
    pub created_at: DateTime<Utc>,
    pub message: NewMessage,
}

#[async_trait]
pub trait MessageStore: Send + Sync {
    async fn save_message(&self, msg: NewMessage) -> Result<StoredMessage>;

    async fn touch_conversation(
        &self,
        conversation_id: &Id,
        last_message: &str,
        at: DateTime<Utc>,
    ) -> Result<()>;
}
