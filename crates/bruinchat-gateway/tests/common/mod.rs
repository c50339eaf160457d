//! In-process harness: drives `serve_connection` over channel-backed socket
//! halves instead of a real WebSocket.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]
#![allow(dead_code)]

use std::convert::Infallible;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::extract::ws::Message;
use chrono::{DateTime, Utc};
use futures_util::{sink, stream};
use jsonwebtoken::{encode, EncodingKey, Header};
use serde_json::Value;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use bruinchat_core::error::{ChatError, Result};
use bruinchat_core::protocol::Id;
use bruinchat_gateway::auth::Claims;
use bruinchat_gateway::config::ReconnectMode;
use bruinchat_gateway::obs::GatewayMetrics;
use bruinchat_gateway::realtime::{Hub, SessionState};
use bruinchat_gateway::services::ChatService;
use bruinchat_gateway::store::{InMemoryMessageStore, MessageStore, NewMessage, StoredMessage};
use bruinchat_gateway::transport::session::{serve_connection, SessionConfig, SessionDeps};

pub const TEST_SECRET: &[u8] = b"test-secret";

pub const RECV_TIMEOUT: Duration = Duration::from_secs(2);

pub fn session_cfg() -> SessionConfig {
    SessionConfig {
        outbound_queue: 16,
        max_frame_bytes: 16384,
        ping_interval: Duration::from_secs(60),
        idle_timeout: Duration::from_secs(60),
        write_timeout: Duration::from_secs(1),
    }
}

pub fn deps_with(store: Arc<dyn MessageStore>, mode: ReconnectMode, cfg: SessionConfig) -> SessionDeps {
    let metrics = Arc::new(GatewayMetrics::default());
    SessionDeps {
        hub: Arc::new(Hub::with_metrics(mode, Arc::clone(&metrics))),
        chat: Arc::new(ChatService::new(store, Arc::clone(&metrics))),
        metrics,
        cfg,
    }
}

pub fn deps(store: Arc<dyn MessageStore>) -> SessionDeps {
    deps_with(store, ReconnectMode::ClosePrevious, session_cfg())
}

/// Client side of one in-process connection.
pub struct Client {
    pub user: String,
    to_server: Option<mpsc::UnboundedSender<Message>>,
    from_server: mpsc::UnboundedReceiver<Message>,
    task: JoinHandle<SessionState>,
}

/// Open a connection for `user`; frames written by the server land in the
/// returned client's inbox.
pub fn connect(deps: &SessionDeps, user: &str) -> Client {
    let (out_tx, out_rx) = mpsc::unbounded_channel::<Message>();
    let writer = Box::pin(sink::unfold(out_tx, |tx, msg: Message| async move {
        tx.send(msg).map_err(|_| "client went away".to_string())?;
        Ok::<_, String>(tx)
    }));
    spawn_client(deps, user, writer, out_rx)
}

/// Open a connection whose socket rejects every write.
pub fn connect_broken_writer(deps: &SessionDeps, user: &str) -> Client {
    let (_out_tx, out_rx) = mpsc::unbounded_channel::<Message>();
    let writer = Box::pin(sink::unfold((), |(), _msg: Message| async move {
        Err::<(), String>("connection reset".to_string())
    }));
    spawn_client(deps, user, writer, out_rx)
}

/// Open a connection whose socket accepts no write ever again.
pub fn connect_stalled_writer(deps: &SessionDeps, user: &str) -> Client {
    let (_out_tx, out_rx) = mpsc::unbounded_channel::<Message>();
    let writer = Box::pin(sink::unfold((), |(), _msg: Message| async move {
        std::future::pending::<std::result::Result<(), String>>().await
    }));
    spawn_client(deps, user, writer, out_rx)
}

fn spawn_client<W>(deps: &SessionDeps, user: &str, writer: W, from_server: mpsc::UnboundedReceiver<Message>) -> Client
where
    W: futures_util::Sink<Message, Error = String> + Unpin + Send + 'static,
{
    let (in_tx, in_rx) = mpsc::unbounded_channel::<Message>();
    let reader = Box::pin(stream::unfold(in_rx, |mut rx| async move {
        rx.recv().await.map(|m| (Ok::<_, Infallible>(m), rx))
    }));

    let task = tokio::spawn(serve_connection(deps.clone(), user.to_string(), reader, writer));

    Client {
        user: user.to_string(),
        to_server: Some(in_tx),
        from_server,
        task,
    }
}

impl Client {
    pub fn send_raw(&self, frame: Message) {
        if let Some(tx) = &self.to_server {
            let _ = tx.send(frame);
        }
    }

    pub fn send_json(&self, v: Value) {
        self.send_raw(Message::Text(v.to_string()));
    }

    /// Next text frame from the server, skipping heartbeats.
    pub async fn recv_json(&mut self) -> Value {
        loop {
            let msg = tokio::time::timeout(RECV_TIMEOUT, self.from_server.recv())
                .await
                .expect("timed out waiting for a server frame")
                .expect("server side closed");
            match msg {
                Message::Text(s) => return serde_json::from_str(&s).expect("server sent invalid json"),
                Message::Ping(_) | Message::Pong(_) => continue,
                other => panic!("unexpected frame: {other:?}"),
            }
        }
    }

    /// Whether a heartbeat ping shows up before the receive timeout.
    pub async fn next_ping(&mut self) -> bool {
        loop {
            match tokio::time::timeout(RECV_TIMEOUT, self.from_server.recv()).await {
                Ok(Some(Message::Ping(_))) => return true,
                Ok(Some(_)) => continue,
                Err(_) | Ok(None) => return false,
            }
        }
    }

    /// Assert no text frame arrives within `window`.
    pub async fn expect_silence(&mut self, window: Duration) {
        let deadline = tokio::time::Instant::now() + window;
        loop {
            match tokio::time::timeout_at(deadline, self.from_server.recv()).await {
                Err(_) | Ok(None) => return,
                Ok(Some(Message::Text(s))) => panic!("unexpected text frame: {s}"),
                Ok(Some(_)) => continue,
            }
        }
    }

    /// Wait for the server side of this connection to finish on its own.
    pub async fn finished(self) -> SessionState {
        let Client { task, to_server, .. } = self;
        let state = tokio::time::timeout(RECV_TIMEOUT, task)
            .await
            .expect("session did not finish")
            .expect("session task panicked");
        drop(to_server);
        state
    }

    /// Hang up from the client side and wait for teardown.
    pub async fn hang_up(mut self) -> SessionState {
        self.to_server.take();
        self.finished().await
    }
}

/// Poll until `cond` holds.
pub async fn wait_until(mut cond: impl FnMut() -> bool) {
    let deadline = tokio::time::Instant::now() + RECV_TIMEOUT;
    while !cond() {
        assert!(tokio::time::Instant::now() < deadline, "condition not reached in time");
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}

/// Wait until `user` is registered with a session that is past `Registered`.
pub async fn wait_active(deps: &SessionDeps, user: &str) {
    let hub = Arc::clone(&deps.hub);
    wait_until(|| {
        hub.lookup(user)
            .map(|s| s.state() == SessionState::Active)
            .unwrap_or(false)
    })
    .await;
}

pub fn chat(conversation: i64, sender: i64, receiver: i64, content: &str) -> Value {
    serde_json::json!({
        "type": "message",
        "conversation_id": conversation,
        "sender_id": sender,
        "receiver_id": receiver,
        "content": content,
    })
}

/// Store whose writes always fail.
pub struct FailingStore;

#[async_trait]
impl MessageStore for FailingStore {
    async fn save_message(&self, _msg: NewMessage) -> Result<StoredMessage> {
        Err(ChatError::Storage("database unavailable".into()))
    }

    async fn touch_conversation(&self, _id: &Id, _last: &str, _at: DateTime<Utc>) -> Result<()> {
        Err(ChatError::Storage("database unavailable".into()))
    }
}

/// HS256 token for `user_id` expiring `exp_offset_secs` from now.
pub fn token(user_id: &str, exp_offset_secs: i64, secret: &[u8]) -> String {
    let now = Utc::now().timestamp();
    let claims = Claims {
        user_id: user_id.to_string(),
        email: format!("{user_id}@ucla.edu"),
        exp: now + exp_offset_secs,
        iat: now,
    };
    encode(&Header::default(), &claims, &EncodingKey::from_secret(secret)).unwrap()
}

/// Store that fails its first `n` saves, then behaves like the in-memory one.
pub struct FlakyStore {
    failures_left: AtomicUsize,
    attempts: AtomicUsize,
    inner: InMemoryMessageStore,
}

impl FlakyStore {
    pub fn failing_first(n: usize) -> Self {
        Self {
            failures_left: AtomicUsize::new(n),
            attempts: AtomicUsize::new(0),
            inner: InMemoryMessageStore::new(),
        }
    }

    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MessageStore for FlakyStore {
    async fn save_message(&self, msg: NewMessage) -> Result<StoredMessage> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        let failing = self
            .failures_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failing {
            return Err(ChatError::Storage("connection reset by peer".into()));
        }
        self.inner.save_message(msg).await
    }

    async fn touch_conversation(&self, id: &Id, last: &str, at: DateTime<Utc>) -> Result<()> {
        self.inner.touch_conversation(id, last, at).await
    }
}
