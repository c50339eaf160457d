//! Realtime core components for the gateway runtime.
//!
//! The hub (connection registry), the per-connection session handle, and the
//! context shared with services.

mod hub;
mod session;

pub use hub::{Hub, RealtimeCtx};
pub use session::{SessionHandle, SessionState};
