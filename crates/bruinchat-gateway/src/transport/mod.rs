//! Transport layer (WebSocket).
//!
//! `ws` authenticates and upgrades, `session` drives one connection's read
//! and write tasks, and `codec` decodes each inbound frame once.

pub mod codec;
pub mod session;
pub mod ws;
