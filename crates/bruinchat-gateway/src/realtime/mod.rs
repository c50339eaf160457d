//! Realtime runtime (egress engine) for the chat gateway.

pub mod core;
pub mod types;

pub use self::core::{Hub, RealtimeCtx, SessionHandle, SessionState};
pub use types::PreparedMsg;
