use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicU8, Ordering};
use std::sync::Arc;

use tokio::sync::mpsc::{self, error::TrySendError};
use tokio_util::sync::CancellationToken;

use crate::realtime::types::PreparedMsg;

static NEXT_SESSION_ID: AtomicU64 = AtomicU64::new(1);

/// Session lifecycle. States only move forward; `Closed` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u8)]
pub enum SessionState {
    Connecting = 0,
    Registered = 1,
    Active = 2,
    Closing = 3,
    Closed = 4,
}

impl SessionState {
    fn from_u8(v: u8) -> Self {
        match v {
            0 => SessionState::Connecting,
            1 => SessionState::Registered,
            2 => SessionState::Active,
            3 => SessionState::Closing,
            _ => SessionState::Closed,
        }
    }
}

/// Producer-side handle of one live connection.
///
/// The hub stores clones of this for routing. The connection itself and the
/// receiving end of the outbound queue stay with the session's own tasks.
#[derive(Clone)]
pub struct SessionHandle {
    inner: Arc<SessionInner>,
}

struct SessionInner {
    id: u64,
    user_id: Arc<str>,
    tx: mpsc::Sender<PreparedMsg>,
    close_once: AtomicBool,
    closed: CancellationToken,
    state: AtomicU8,
}

impl SessionHandle {
    /// Create a session in `Connecting` state with a bounded outbound queue.
    pub fn new(user_id: impl Into<Arc<str>>, capacity: usize) -> (Self, mpsc::Receiver<PreparedMsg>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let inner = SessionInner {
            id: NEXT_SESSION_ID.fetch_add(1, Ordering::Relaxed),
            user_id: user_id.into(),
            tx,
            close_once: AtomicBool::new(false),
            closed: CancellationToken::new(),
            state: AtomicU8::new(SessionState::Connecting as u8),
        };
        (Self { inner: Arc::new(inner) }, rx)
    }

    pub fn id(&self) -> u64 {
        self.inner.id
    }

    pub fn user_id(&self) -> &str {
        &self.inner.user_id
    }

    /// Identity comparison (same connection), not equality of user ids.
    pub fn same_session(&self, other: &SessionHandle) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Non-blocking enqueue. A closed session reports `Closed` even if its
    /// queue still has room.
    pub fn try_enqueue(&self, msg: PreparedMsg) -> Result<(), TrySendError<PreparedMsg>> {
        if self.is_closed() {
            return Err(TrySendError::Closed(msg));
        }
        self.inner.tx.try_send(msg)
    }

    /// Close the outbound queue. Idempotent; returns `true` for the call that
    /// actually closed it.
    pub fn close(&self) -> bool {
        if self.inner.close_once.swap(true, Ordering::AcqRel) {
            return false;
        }
        self.advance(SessionState::Closing);
        self.inner.closed.cancel();
        true
    }

    pub fn is_closed(&self) -> bool {
        self.inner.close_once.load(Ordering::Acquire)
    }

    /// Resolves once [`SessionHandle::close`] has been called.
    pub async fn closed(&self) {
        self.inner.closed.cancelled().await
    }

    pub fn state(&self) -> SessionState {
        SessionState::from_u8(self.inner.state.load(Ordering::Acquire))
    }

    /// Move forward to `to`; never moves backwards. Returns the previous state.
    pub(crate) fn advance(&self, to: SessionState) -> SessionState {
        SessionState::from_u8(self.inner.state.fetch_max(to as u8, Ordering::AcqRel))
    }
}

impl fmt::Debug for SessionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionHandle")
            .field("id", &self.inner.id)
            .field("user_id", &self.inner.user_id)
            .field("state", &self.state())
            .finish()
    }
}
