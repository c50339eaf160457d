use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::mpsc::error::TrySendError;

use bruinchat_core::error::{ChatError, Result};

use crate::config::ReconnectMode;
use crate::obs::GatewayMetrics;
use crate::realtime::core::session::{SessionHandle, SessionState};
use crate::realtime::types::PreparedMsg;

/// Connection registry: `user_id -> current session`.
///
/// Every operation touches the map only through single-entry `DashMap`
/// calls; the shard lock is never held across an enqueue or any I/O.
/// Closing a session here only closes its outbound queue; the session's own
/// tasks tear the connection down.
pub struct Hub {
    sessions: DashMap<String, SessionHandle>,
    on_reconnect: ReconnectMode,
    metrics: Arc<GatewayMetrics>,
    shutting_down: AtomicBool,
}

impl Hub {
    pub fn new(on_reconnect: ReconnectMode) -> Self {
        Self::with_metrics(on_reconnect, Arc::new(GatewayMetrics::default()))
    }

    pub fn with_metrics(on_reconnect: ReconnectMode, metrics: Arc<GatewayMetrics>) -> Self {
        Self {
            sessions: DashMap::new(),
            on_reconnect,
            metrics,
            shutting_down: AtomicBool::new(false),
        }
    }

    pub fn metrics(&self) -> &GatewayMetrics {
        &self.metrics
    }

    /// Make `session` the one routing target for its user.
    ///
    /// A previous session for the same user is overwritten and, under
    /// [`ReconnectMode::ClosePrevious`], closed. Fails once shutdown began;
    /// the new session is closed in that case.
    pub fn register(&self, session: &SessionHandle) -> Result<()> {
        let user_id = session.user_id().to_string();
        session.advance(SessionState::Registered);

        let previous = self.sessions.insert(user_id.clone(), session.clone());

        // Checked after the insert: either shutdown() sees this entry or we see its flag.
        if self.shutting_down.load(Ordering::SeqCst) {
            self.unregister(&user_id, session);
            if let Some(prev) = previous {
                prev.close();
            }
            self.metrics.hub_registrations.inc(&[("outcome", "rejected")]);
            return Err(ChatError::Unavailable("hub is shutting down".into()));
        }

        match previous {
            Some(prev) if !prev.same_session(session) => {
                self.metrics.hub_registrations.inc(&[("outcome", "replaced")]);
                match self.on_reconnect {
                    ReconnectMode::ClosePrevious => {
                        prev.close();
                        tracing::info!(
                            user_id = %user_id,
                            old_session = prev.id(),
                            new_session = session.id(),
                            "superseded session closed"
                        );
                    }
                    ReconnectMode::KeepPrevious => {
                        tracing::info!(
                            user_id = %user_id,
                            old_session = prev.id(),
                            new_session = session.id(),
                            "session superseded; old connection left to expire"
                        );
                    }
                }
            }
            Some(_) => {}
            None => {
                self.metrics.hub_registrations.inc(&[("outcome", "new")]);
                tracing::debug!(user_id = %user_id, session_id = session.id(), "session registered");
            }
        }

        Ok(())
    }

    /// Remove `session` if it is still the registered one for `user_id`.
    ///
    /// A superseded session never removes its successor. The caller's
    /// outbound queue is closed either way. Returns whether the map changed.
    pub fn unregister(&self, user_id: &str, session: &SessionHandle) -> bool {
        let removed = self
            .sessions
            .remove_if(user_id, |_, current| current.same_session(session))
            .is_some();
        session.close();

        if removed {
            tracing::debug!(user_id = %user_id, session_id = session.id(), "session unregistered");
        } else {
            tracing::debug!(user_id = %user_id, session_id = session.id(), "stale unregister ignored");
        }
        removed
    }

    /// Current routing target for `user_id`.
    pub fn lookup(&self, user_id: &str) -> Option<SessionHandle> {
        self.sessions.get(user_id).map(|e| e.value().clone())
    }

    /// Try to enqueue `msg` for `user_id` without waiting.
    ///
    /// A full queue marks the target as dead: it is unregistered and the call
    /// reports `false`, as it does for an unknown user.
    pub fn send_to_user(&self, user_id: &str, msg: PreparedMsg) -> bool {
        let Some(session) = self.lookup(user_id) else {
            self.metrics.hub_deliveries.inc(&[("outcome", "offline")]);
            return false;
        };

        match session.try_enqueue(msg) {
            Ok(()) => {
                self.metrics.hub_deliveries.inc(&[("outcome", "delivered")]);
                true
            }
            Err(TrySendError::Full(_)) => {
                self.metrics.hub_deliveries.inc(&[("outcome", "overflow")]);
                tracing::warn!(
                    user_id = %user_id,
                    session_id = session.id(),
                    "outbound queue full; dropping session"
                );
                self.unregister(user_id, &session);
                false
            }
            Err(TrySendError::Closed(_)) => {
                self.metrics.hub_deliveries.inc(&[("outcome", "closed")]);
                self.unregister(user_id, &session);
                false
            }
        }
    }

    /// Out-of-band push (notifications etc.) outside the chat-frame path.
    pub fn push(&self, user_id: &str, payload: &serde_json::Value) -> Result<bool> {
        let msg = PreparedMsg::json(payload)?;
        Ok(self.send_to_user(user_id, msg))
    }

    pub fn contains(&self, user_id: &str) -> bool {
        self.sessions.contains_key(user_id)
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Refuse further registrations and close every registered session.
    /// Sessions remove themselves as they finish. Returns how many were closed.
    pub fn shutdown(&self) -> usize {
        self.shutting_down.store(true, Ordering::SeqCst);
        let sessions: Vec<SessionHandle> = self.sessions.iter().map(|e| e.value().clone()).collect();
        for s in &sessions {
            s.close();
        }
        sessions.len()
    }

    pub fn is_shutting_down(&self) -> bool {
        self.shutting_down.load(Ordering::SeqCst)
    }
}

/// Per-session context handed to services (borrow tools instead of owning).
#[derive(Clone)]
pub struct RealtimeCtx {
    session: SessionHandle,
    hub: Arc<Hub>,
}

impl RealtimeCtx {
    pub fn new(session: SessionHandle, hub: Arc<Hub>) -> Self {
        Self { session, hub }
    }

    pub fn user(&self) -> &str {
        self.session.user_id()
    }

    pub fn session_id(&self) -> u64 {
        self.session.id()
    }

    pub fn hub(&self) -> &Hub {
        &self.hub
    }

    pub fn send_to_user(&self, user_id: &str, msg: PreparedMsg) -> bool {
        self.hub.send_to_user(user_id, msg)
    }
}
