//! Per-connection session driver.
//!
//! One connection runs two tasks:
//! - reader (the calling task): decode inbound frames, hand chat envelopes to
//!   the chat service
//! - writer (spawned): drain the bounded outbound queue into the socket and
//!   send heartbeat pings
//!
//! Either side ending closes the session's queue, which stops the other side.
//! `serve_connection` returns only after both have finished and the hub entry
//! is gone.

use std::fmt;
use std::sync::Arc;

use axum::extract::ws::Message;
use futures_util::{Sink, SinkExt, Stream, StreamExt};
use tokio::sync::mpsc;
use tokio::time::{interval_at, timeout, Duration, Instant, MissedTickBehavior};
use tracing::Instrument;

use bruinchat_core::error::{ChatError, Result};

use crate::config::GatewayConfig;
use crate::obs::GatewayMetrics;
use crate::realtime::{Hub, PreparedMsg, RealtimeCtx, SessionHandle, SessionState};
use crate::services::ChatService;
use crate::transport::codec::{decode, error_reason, Inbound};

/// Runtime knobs for one session.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub outbound_queue: usize,
    pub max_frame_bytes: usize,
    pub ping_interval: Duration,
    pub idle_timeout: Duration,
    pub write_timeout: Duration,
}

impl SessionConfig {
    pub fn from_config(cfg: &GatewayConfig) -> Self {
        Self {
            outbound_queue: cfg.hub.outbound_queue,
            max_frame_bytes: cfg.hub.max_frame_bytes,
            ping_interval: Duration::from_millis(cfg.gateway.ping_interval_ms),
            idle_timeout: Duration::from_millis(cfg.gateway.idle_timeout_ms),
            write_timeout: Duration::from_millis(cfg.gateway.write_timeout_ms),
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            outbound_queue: 256,
            max_frame_bytes: 16384,
            ping_interval: Duration::from_secs(20),
            idle_timeout: Duration::from_secs(60),
            write_timeout: Duration::from_secs(5),
        }
    }
}

/// Everything a session needs from the process.
#[derive(Clone)]
pub struct SessionDeps {
    pub hub: Arc<Hub>,
    pub chat: Arc<ChatService>,
    pub metrics: Arc<GatewayMetrics>,
    pub cfg: SessionConfig,
}

/// Serve one authenticated connection until it is fully torn down.
///
/// `reader`/`writer` are the two halves of the connection (for axum, the
/// result of `WebSocket::split`). Returns the final session state, which is
/// always [`SessionState::Closed`].
pub async fn serve_connection<R, W, E>(
    deps: SessionDeps,
    user_id: String,
    reader: R,
    writer: W,
) -> SessionState
where
    R: Stream<Item = std::result::Result<Message, E>> + Unpin + Send,
    E: fmt::Display + Send,
    W: Sink<Message> + Unpin + Send + 'static,
    W::Error: fmt::Display + Send,
{
    let (session, rx) = SessionHandle::new(user_id, deps.cfg.outbound_queue);
    let span = tracing::info_span!("session", user_id = %session.user_id(), session_id = session.id());

    deps.metrics.connections_open.inc(&[]);

    async {
        let registered = match deps.hub.register(&session) {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(error = %e, "session registration refused");
                false
            }
        };

        let writer_task = tokio::spawn(
            write_loop(
                session.clone(),
                rx,
                FrameWriter {
                    sink: writer,
                    timeout: deps.cfg.write_timeout,
                    metrics: Arc::clone(&deps.metrics),
                },
                deps.cfg.ping_interval,
            )
            .in_current_span(),
        );

        if registered {
            session.advance(SessionState::Active);
            tracing::info!("session active");
            read_loop(&deps, &session, reader).await;
        }

        session.advance(SessionState::Closing);
        deps.hub.unregister(session.user_id(), &session);

        if let Err(e) = writer_task.await {
            tracing::warn!(error = %e, "writer task failed");
        }

        session.advance(SessionState::Closed);
        tracing::info!("session closed");
    }
    .instrument(span)
    .await;

    deps.metrics.connections_open.dec(&[]);
    session.state()
}

async fn read_loop<R, E>(deps: &SessionDeps, session: &SessionHandle, mut reader: R)
where
    R: Stream<Item = std::result::Result<Message, E>> + Unpin,
    E: fmt::Display,
{
    let ctx = RealtimeCtx::new(session.clone(), Arc::clone(&deps.hub));

    loop {
        let next = tokio::select! {
            _ = session.closed() => {
                tracing::debug!("session closed; reader stopping");
                break;
            }
            next = timeout(deps.cfg.idle_timeout, reader.next()) => next,
        };

        let msg = match next {
            Err(_) => {
                tracing::info!(idle_ms = deps.cfg.idle_timeout.as_millis() as u64, "idle timeout");
                break;
            }
            Ok(None) => {
                tracing::debug!("websocket stream ended");
                break;
            }
            Ok(Some(Err(e))) => {
                tracing::warn!(error = %e, "websocket receive error");
                break;
            }
            Ok(Some(Ok(msg))) => msg,
        };

        match decode(msg, deps.cfg.max_frame_bytes) {
            Ok(Inbound::Text { env, bytes_len }) => {
                tracing::trace!(bytes_len, kind = %env.kind, "frame received");
                deps.chat.handle(&ctx, env).await;
            }
            Ok(Inbound::Ping) | Ok(Inbound::Pong) => {}
            Ok(Inbound::Close) => {
                tracing::debug!("client initiated close");
                break;
            }
            Err(e) => {
                deps.metrics.decode_errors.inc(&[("reason", error_reason(&e))]);
                tracing::warn!(error = %e, "dropping malformed frame");
            }
        }
    }
}

/// Drain the outbound queue into `out` and ping every `ping_every`.
///
/// A close is only observed between writes: a write already in flight runs
/// until it completes or `write_timeout` expires, so teardown of a stalled
/// peer takes at most one write timeout.
async fn write_loop<W>(
    session: SessionHandle,
    mut rx: mpsc::Receiver<PreparedMsg>,
    mut out: FrameWriter<W>,
    ping_every: Duration,
) where
    W: Sink<Message> + Unpin,
    W::Error: fmt::Display,
{
    let mut ping = interval_at(Instant::now() + ping_every, ping_every);
    ping.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let res: Result<()> = loop {
        tokio::select! {
            biased;

            maybe = rx.recv() => match maybe {
                Some(msg) => {
                    if let Err(e) = out.send(msg.into_ws_message()).await {
                        break Err(e);
                    }
                }
                None => break Ok(()),
            },

            _ = session.closed() => {
                break drain(&mut rx, &mut out).await;
            }

            _ = ping.tick() => {
                if let Err(e) = out.send(Message::Ping(Vec::new())).await {
                    break Err(e);
                }
            }
        }
    };

    if let Err(e) = res {
        tracing::warn!(error = %e, "websocket write failed; closing session");
        session.close();
    }
    out.close().await;
}

/// Queue is closed: stop accepting, flush what is already queued.
async fn drain<W>(rx: &mut mpsc::Receiver<PreparedMsg>, out: &mut FrameWriter<W>) -> Result<()>
where
    W: Sink<Message> + Unpin,
    W::Error: fmt::Display,
{
    rx.close();
    while let Some(msg) = rx.recv().await {
        out.send(msg.into_ws_message()).await?;
    }
    Ok(())
}

/// Sink wrapper bounding every write by `timeout`.
struct FrameWriter<W> {
    sink: W,
    timeout: Duration,
    metrics: Arc<GatewayMetrics>,
}

impl<W> FrameWriter<W>
where
    W: Sink<Message> + Unpin,
    W::Error: fmt::Display,
{
    async fn send(&mut self, msg: Message) -> Result<()> {
        match timeout(self.timeout, self.sink.send(msg)).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => Err(ChatError::Unavailable(format!("websocket send failed: {e}"))),
            Err(_) => {
                self.metrics.writer_timeouts.inc(&[]);
                Err(ChatError::Unavailable("websocket send timed out".into()))
            }
        }
    }

    async fn close(&mut self) {
        let _ = timeout(self.timeout, self.sink.close()).await;
    }
}
