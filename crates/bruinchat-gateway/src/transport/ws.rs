//! WebSocket upgrade handler.
//!
//! `GET /api/ws?token=<jwt>`: the token is verified before the upgrade, so a
//! rejected client gets a plain HTTP 401 and no session is ever created.

use axum::{
    extract::{ws::WebSocketUpgrade, Query, State},
    response::{IntoResponse, Response},
};
use futures_util::StreamExt;
use serde::Deserialize;

use bruinchat_core::error::ChatError;

use crate::app_state::AppState;
use crate::error::HttpError;
use crate::transport::session::serve_connection;

#[derive(Debug, Deserialize)]
pub struct WsQuery {
    #[serde(default)]
    pub token: Option<String>,
}

pub async fn ws_upgrade(
    State(app): State<AppState>,
    ws: WebSocketUpgrade,
    Query(q): Query<WsQuery>,
) -> Response {
    let metrics = app.metrics();

    if app.is_draining() {
        metrics.ws_upgrades.inc(&[("result", "draining")]);
        return HttpError(ChatError::Unavailable("server is shutting down".into())).into_response();
    }

    let claims = match app.verifier().verify(q.token.as_deref().unwrap_or_default()) {
        Ok(claims) => claims,
        Err(e) => {
            metrics.ws_upgrades.inc(&[("result", "rejected")]);
            tracing::info!(error = %e, "websocket upgrade rejected");
            return HttpError(e).into_response();
        }
    };
    metrics.ws_upgrades.inc(&[("result", "accepted")]);

    let deps = app.session_deps();
    // Oversized frames are reported by the codec; axum only caps runaway input.
    let max_message = deps.cfg.max_frame_bytes.saturating_mul(4);

    ws.max_message_size(max_message)
        .on_upgrade(move |socket| async move {
            let (sink, stream) = socket.split();
            serve_connection(deps, claims.user_id, stream, sink).await;
        })
}
