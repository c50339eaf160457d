//! bruinchat core: transport-agnostic chat protocol and error types.
//!
//! This crate defines the wire-level envelopes and the error surface shared by
//! the gateway and its tests. It carries no transport or runtime dependencies
//! so the protocol can be reused by other hosts (e.g. a push worker).
//!
//! # Panic policy
//! Panics, `unwrap`, and `expect` are compile-denied here
//! (`#![deny(clippy::panic, clippy::unwrap_used, clippy::expect_used)]`).
//! Malformed frames surface as `ChatError`/`Result`, never as a crash.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

pub mod error;
pub mod protocol;

pub use error::{ChatError, ClientCode, Result};
