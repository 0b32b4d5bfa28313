//! # Solder Transport
//!
//! Transport adapters for the Solder gateway.
//!
//! Two interchangeable transports connect a process of [`App`](solder_core::App)
//! instances to an OneBot v11 backend:
//!
//! | Transport | Direction | Use case |
//! |-----------|-----------|----------|
//! | [`HttpPushTransport`] | inbound | backend POSTs signed events to us |
//! | [`WsClientTransport`] | outbound | we hold a persistent socket, events and command responses arrive on it |
//!
//! Both feed inbound payloads through the same dispatch path: normalize the
//! wire payload, resolve (or late-bind) the owning app by `selfId`, then
//! forward to that app's event sink. The WebSocket transport additionally
//! correlates command responses back to their callers by `echo` id.
//!
//! ## Quick start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use solder_core::{App, AppConfig, TransportKind};
//! use solder_transport::TransportRegistry;
//!
//! let registry = TransportRegistry::new();
//! let config = AppConfig {
//!     transport: Some(TransportKind::Ws),
//!     server_url: Some("ws://127.0.0.1:6700".into()),
//!     ..Default::default()
//! };
//! let app = Arc::new(App::new(config, sink));
//! let transport = registry.attach(app)?;
//! transport.listen().await?;
//! ```

mod correlation;
mod dispatch;
mod factory;
pub mod http;
mod traits;
pub mod websocket;

pub use correlation::EchoSequence;
pub use factory::TransportRegistry;
pub use http::HttpPushTransport;
pub use traits::Transport;
pub use websocket::{ConnectionState, WsClientTransport};

/// The reserved echo id of the startup capability probe. Used exactly once
/// per connection and never produced by [`EchoSequence`].
pub const PROBE_ECHO: i64 = -1;
