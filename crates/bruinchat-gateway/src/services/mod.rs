//! Built-in services.

pub mod chat;

pub use chat::{ChatService, Delivery};
