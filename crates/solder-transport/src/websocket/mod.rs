//! Outbound WebSocket client transport.

mod client;

pub use client::{ConnectionState, WsClientTransport};
