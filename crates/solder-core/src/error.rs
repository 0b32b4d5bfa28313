//! Unified error types for the Solder gateway.

use thiserror::Error;

// =============================================================================
// Configuration Errors
// =============================================================================

/// Errors raised synchronously while constructing a transport from
/// configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// No transport kind was configured.
    #[error("missing configuration \"transport\"")]
    MissingKind,

    /// The configured transport kind requires a field that is absent.
    #[error("missing configuration \"{0}\"")]
    MissingField(&'static str),
}

// =============================================================================
// Transport Errors
// =============================================================================

/// Errors that can occur while opening or running a transport.
#[derive(Debug, Clone, Error)]
pub enum TransportError {
    /// Connection failed.
    #[error("connection failed: {url} - {reason}")]
    ConnectionFailed {
        /// The URL that failed to connect.
        url: String,
        /// Reason for failure.
        reason: String,
    },

    /// Connection closed before setup completed.
    #[error("connection closed: {reason}")]
    ConnectionClosed {
        /// Reason for closure.
        reason: String,
    },

    /// The startup capability probe was rejected by the backend.
    #[error("authorization failed")]
    AuthorizationFailed,

    /// A configured value cannot be carried in a request header.
    #[error("invalid header value: {0}")]
    InvalidHeader(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(String),
}

impl From<std::io::Error> for TransportError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

/// Result type for transport operations.
pub type TransportResult<T> = Result<T, TransportError>;

// =============================================================================
// Command Errors
// =============================================================================

/// Errors observed by callers awaiting a correlated command response.
#[derive(Debug, Error)]
pub enum CommandError {
    /// The transport has no open connection to transmit on.
    #[error("not connected")]
    NotConnected,

    /// The transmit call itself failed.
    #[error("failed to send command: {0}")]
    SendFailed(String),

    /// No response arrived within the configured timeout.
    #[error("command timed out")]
    Timeout,

    /// The connection closed while the command was outstanding.
    #[error("connection closed before response")]
    ConnectionClosed,

    /// The command payload could not be serialized.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
