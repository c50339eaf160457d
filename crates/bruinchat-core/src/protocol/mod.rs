//! Chat wire protocol.
//!
//! Text frames carry JSON envelopes discriminated by `type`. Only
//! `"message"` envelopes are routed; every other type is accepted and ignored
//! so newer clients can send events this server does not know yet.
//!
//! Parsers are panic-free: malformed input is reported as `ChatError`.

pub mod envelope;
pub mod id;

pub use envelope::{ChatFrame, InboundEnvelope, OutboundMessage, MESSAGE_TYPE};
pub use id::Id;
