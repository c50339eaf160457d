use std::sync::atomic::{AtomicI64, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;

use bruinchat_core::error::Result;
use bruinchat_core::protocol::Id;

use super::{MessageStore, NewMessage, StoredMessage};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversationSummary {
    pub last_message: String,
    pub updated_at: DateTime<Utc>,
}

/// Process-local store used by the dev binary and tests.
pub struct InMemoryMessageStore {
    next_id: AtomicI64,
    messages: DashMap<String, Vec<StoredMessage>>,
    conversations: DashMap<String, ConversationSummary>,
}

impl InMemoryMessageStore {
    pub fn new() -> Self {
        Self {
            next_id: AtomicI64::new(1),
            messages: DashMap::new(),
            conversations: DashMap::new(),
        }
    }

    /// Messages of one conversation in insertion order.
    pub fn messages(&self, conversation_id: &Id) -> Vec<StoredMessage> {
        self.messages
            .get(&conversation_id.key())
            .map(|v| v.value().clone())
            .unwrap_or_default()
    }

    pub fn conversation(&self, conversation_id: &Id) -> Option<ConversationSummary> {
        self.conversations
            .get(&conversation_id.key())
            .map(|c| c.value().clone())
    }

    pub fn message_count(&self) -> usize {
        self.messages.iter().map(|e| e.value().len()).sum()
    }
}

impl Default for InMemoryMessageStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MessageStore for InMemoryMessageStore {
    async fn save_message(&self, msg: NewMessage) -> Result<StoredMessage> {
        let stored = StoredMessage {
            message_id: self.next_id.fetch_add(1, Ordering::Relaxed),
            created_at: Utc::now(),
            message: msg,
        };
        self.messages
            .entry(stored.message.conversation_id.key())
            .or_default()
            .push(stored.clone());
        Ok(stored)
    }

    async fn touch_conversation(
        &self,
        conversation_id: &Id,
        last_message: &str,
        at: DateTime<Utc>,
    ) -> Result<()> {
        let mut entry = self
            .conversations
            .entry(conversation_id.key())
            .or_insert_with(|| ConversationSummary {
                last_message: String::new(),
                updated_at: at,
            });
        // out-of-order touches must not roll the summary back
        if at >= entry.updated_at {
            entry.last_message = last_message.to_string();
            entry.updated_at = at;
        }
        Ok(())
    }
}
