//! Configuration schema for gateway application instances.
//!
//! Each [`AppConfig`](crate::AppConfig) describes one logical bot identity
//! and how it reaches its backend. The schema is typically embedded in the
//! host's own configuration file:
//!
//! ```yaml
//! apps:
//!   - self_id: 514
//!     transport: ws
//!     server_url: ws://127.0.0.1:6700
//!     access_token: ${BOT_TOKEN:-}
//!   - transport: http
//!     port: 8080
//!     secret: hunter2
//!     verify_on_listen: true
//! ```

use serde::{Deserialize, Serialize};

/// The transport used to exchange payloads with the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportKind {
    /// Inbound HTTP push receiver.
    Http,
    /// Outbound persistent WebSocket client.
    Ws,
}

impl std::fmt::Display for TransportKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransportKind::Http => f.write_str("http"),
            TransportKind::Ws => f.write_str("ws"),
        }
    }
}

/// Configuration for one application instance.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    /// The bot account this instance represents. May be left unset, in which
    /// case the identity is bound from the first inbound event that cannot
    /// be routed to an already-known instance.
    pub self_id: Option<i64>,

    /// Which transport to use.
    pub transport: Option<TransportKind>,

    /// Listen port (required for `http`).
    pub port: Option<u16>,

    /// Backend WebSocket URL (required for `ws`).
    pub server_url: Option<String>,

    /// Bearer token sent in the WebSocket handshake.
    pub access_token: Option<String>,

    /// Shared secret for HTTP push signature verification.
    pub secret: Option<String>,

    /// Whether the HTTP endpoint doubles as the capability-verification
    /// channel: `listen()` then probes the backend and fails on rejection.
    pub verify_on_listen: bool,

    /// Timeout for correlated commands in milliseconds.
    #[serde(default = "default_command_timeout_ms")]
    pub command_timeout_ms: u64,
}

/// Default command timeout (30 seconds).
pub fn default_command_timeout_ms() -> u64 {
    30_000
}
