use std::sync::Arc;
use std::time::Instant;

use bruinchat_core::protocol::{InboundEnvelope, OutboundMessage};

use crate::obs::GatewayMetrics;
use crate::realtime::{PreparedMsg, RealtimeCtx};
use crate::store::{MessageStore, NewMessage};

/// Result of handling one confirmed chat message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    pub message_id: i64,
    pub to_receiver: bool,
    pub to_sender: bool,
}

/// Direct-message service: validate, persist, then fan out to receiver and
/// sender echo.
pub struct ChatService {
    store: Arc<dyn MessageStore>,
    metrics: Arc<GatewayMetrics>,
}

impl ChatService {
    pub fn new(store: Arc<dyn MessageStore>, metrics: Arc<GatewayMetrics>) -> Self {
        Self { store, metrics }
    }

    /// Handle one decoded envelope from `ctx`'s session.
    ///
    /// Returns `None` when nothing was delivered: non-message types, invalid
    /// messages, and messages the store failed to persist. A persistence
    /// failure is not reported back to the sender.
    ///
    /// A message addressed to its own sender is enqueued once, not twice.
    pub async fn handle(&self, ctx: &RealtimeCtx, env: InboundEnvelope) -> Option<Delivery> {
        let kind = env.kind.clone();
        let frame = match env.into_chat(ctx.user()) {
            Ok(Some(frame)) => frame,
            Ok(None) => {
                tracing::debug!(kind = %kind, "ignoring non-message envelope");
                return None;
            }
            Err(e) => {
                self.metrics.decode_errors.inc(&[("reason", "invalid")]);
                tracing::warn!(error = %e, "dropping invalid chat message");
                return None;
            }
        };

        let started = Instant::now();
        let saved = self.store.save_message(NewMessage::from(&frame)).await;
        self.metrics.persist_duration.observe(&[], started.elapsed());

        let stored = match saved {
            Ok(stored) => stored,
            Err(e) => {
                self.metrics.persist_failures.inc(&[]);
                tracing::warn!(
                    error = %e,
                    conversation_id = %frame.conversation_id,
                    receiver_id = %frame.receiver_id,
                    "message not persisted; dropped without delivery"
                );
                return None;
            }
        };

        let out = OutboundMessage::confirmed(frame, stored.message_id, stored.created_at);
        let prepared = match out.to_json() {
            Ok(s) => PreparedMsg::text(s),
            Err(e) => {
                tracing::error!(error = %e, message_id = out.message_id, "outbound encode failed");
                return None;
            }
        };

        let receiver = out.receiver_id.key();
        let sender = out.sender_id.key();
        let to_receiver = ctx.send_to_user(&receiver, prepared.clone());
        // messaging yourself must not produce two copies on one session
        let to_sender = if sender == receiver {
            to_receiver
        } else {
            ctx.send_to_user(&sender, prepared)
        };

        tracing::debug!(
            message_id = out.message_id,
            conversation_id = %out.conversation_id,
            to_receiver,
            to_sender,
            "message fanned out"
        );

        let store = Arc::clone(&self.store);
        let conversation_id = out.conversation_id.clone();
        let content = out.content.clone();
        let at = out.created_at;
        tokio::spawn(async move {
            if let Err(e) = store.touch_conversation(&conversation_id, &content, at).await {
                tracing::warn!(
                    error = %e,
                    conversation_id = %conversation_id,
                    "conversation last-message update failed"
                );
            }
        });

        Some(Delivery {
            message_id: out.message_id,
            to_receiver,
            to_sender,
        })
    }
}
