//! WebSocket client library
//!
//! Reconnecting WebSocket client with exponential backoff and either
//! protocol or text keep-alives.

mod client;
mod types;

pub use client::WsClient;
pub use types::{Keepalive, WsConfig, WsError, WsMessage};
