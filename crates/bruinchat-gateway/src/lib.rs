//! BruinChat realtime gateway.
//!
//! Wires JWT-authenticated WebSocket transport, the per-user connection hub,
//! and the direct-message service into one axum application. Consumed by the
//! binary (`main.rs`) and by integration tests.

pub mod app_state;
pub mod auth;
pub mod config;
pub mod error;
pub mod obs;
pub mod ops;
pub mod realtime;
pub mod router;
pub mod services;
pub mod store;
pub mod transport;
