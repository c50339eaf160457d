//! Axum router wiring.
//!
//! - `/api/ws`  : authenticated WebSocket upgrade
//! - `/healthz`, `/readyz`, `/metrics` : operational endpoints

use axum::{routing::get, Router};

use crate::{app_state::AppState, ops, transport};

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/api/ws", get(transport::ws::ws_upgrade))
        .route("/healthz", get(ops::healthz))
        .route("/readyz", get(ops::readyz))
        .route("/metrics", get(ops::metrics))
        .with_state(state)
}
