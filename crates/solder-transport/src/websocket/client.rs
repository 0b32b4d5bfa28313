//! Persistent WebSocket client.
//!
//! One connection per backend URL, used bidirectionally: the backend pushes
//! events (frames carrying `post_type`) and answers commands (frames echoing
//! the `echo` id of a prior [`send`](WsClientTransport::send)). At connect
//! time the client transmits a capability probe under the reserved echo id
//! [`PROBE_ECHO`](crate::PROBE_ECHO); the probe's response populates
//! [`version`](WsClientTransport::version), and the first frame of any kind
//! completes `listen()`.

use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use serde_json::{Value, json};
use tokio::net::TcpStream;
use tokio::sync::{Mutex, oneshot};
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::http::header::AUTHORIZATION;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async, tungstenite::Message};
use tracing::{debug, info, trace, warn};

use solder_core::{App, CommandError, TransportError, TransportResult, VersionInfo};

use crate::PROBE_ECHO;
use crate::correlation::{EchoSequence, PendingCommands};
use crate::dispatch::DispatchCore;
use crate::traits::Transport;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
type WsSink = SplitSink<WsStream, Message>;
type WsSource = SplitStream<WsStream>;

/// Connection lifecycle. `Closed` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Socket not yet open, or open but no frame received.
    Connecting,
    /// First frame received; connection is live.
    Open,
    /// Explicitly closed or torn down by a socket error.
    Closed,
}

/// State shared between the transport handle and its read loop.
struct WsShared {
    core: DispatchCore,
    pending: PendingCommands,
    version: parking_lot::Mutex<Option<VersionInfo>>,
    state: AtomicU8,
    sink: Mutex<Option<WsSink>>,
}

impl WsShared {
    fn set_state(&self, state: ConnectionState) {
        self.state.store(state as u8, Ordering::SeqCst);
    }

    fn state(&self) -> ConnectionState {
        match self.state.load(Ordering::SeqCst) {
            0 => ConnectionState::Connecting,
            1 => ConnectionState::Open,
            _ => ConnectionState::Closed,
        }
    }
}

/// Outbound persistent client for one backend URL.
pub struct WsClientTransport {
    shared: Arc<WsShared>,
    url: String,
    token: Option<String>,
    seq: EchoSequence,
    command_timeout: Duration,
}

impl WsClientTransport {
    /// Creates a client for `url`. `token` is sent as a bearer authorization
    /// header in the handshake; `seq` supplies `echo` ids (one sequence is
    /// shared across every client in the process).
    pub fn new(
        url: impl Into<String>,
        token: Option<String>,
        seq: EchoSequence,
        command_timeout: Duration,
    ) -> Self {
        Self {
            shared: Arc::new(WsShared {
                core: DispatchCore::new(),
                pending: PendingCommands::new(),
                version: parking_lot::Mutex::new(None),
                state: AtomicU8::new(ConnectionState::Connecting as u8),
                sink: Mutex::new(None),
            }),
            url: url.into(),
            token,
            seq,
            command_timeout,
        }
    }

    /// Sends a command and waits for its correlated response.
    ///
    /// The next `echo` id is assigned before anything is awaited, so
    /// concurrent callers receive distinct, strictly increasing ids; their
    /// responses may resolve in any order. A transmit failure rejects
    /// immediately; otherwise the call waits up to the configured timeout,
    /// evicting its own table entry on expiry.
    pub async fn send(&self, mut command: Value) -> Result<Value, CommandError> {
        let echo = self.seq.next_id();
        match command.as_object_mut() {
            Some(map) => {
                map.insert("echo".into(), json!(echo));
            }
            None => {
                return Err(CommandError::SendFailed(
                    "command payload must be a JSON object".into(),
                ));
            }
        }

        let rx = self.shared.pending.register(echo);
        if let Err(e) = self.transmit(&command).await {
            self.shared.pending.discard(echo);
            return Err(e);
        }
        debug!(echo, action = ?command.get("action"), "command sent");

        match timeout(self.command_timeout, rx).await {
            Ok(Ok(response)) => Ok(response),
            Ok(Err(_)) => Err(CommandError::ConnectionClosed),
            Err(_) => {
                self.shared.pending.discard(echo);
                Err(CommandError::Timeout)
            }
        }
    }

    /// Version info recorded from the startup probe's response.
    pub fn version(&self) -> Option<VersionInfo> {
        self.shared.version.lock().clone()
    }

    /// Current connection state.
    pub fn state(&self) -> ConnectionState {
        self.shared.state()
    }

    async fn transmit(&self, payload: &Value) -> Result<(), CommandError> {
        let text = serde_json::to_string(payload)?;
        let mut guard = self.shared.sink.lock().await;
        let Some(sink) = guard.as_mut() else {
            return Err(CommandError::NotConnected);
        };
        sink.send(Message::text(text))
            .await
            .map_err(|e| CommandError::SendFailed(e.to_string()))
    }

    async fn open(&self) -> TransportResult<()> {
        let mut request =
            self.url
                .as_str()
                .into_client_request()
                .map_err(|e| TransportError::ConnectionFailed {
                    url: self.url.clone(),
                    reason: e.to_string(),
                })?;
        if let Some(token) = &self.token {
            let value = HeaderValue::from_str(&format!("Bearer {token}"))
                .map_err(|e| TransportError::InvalidHeader(e.to_string()))?;
            request.headers_mut().insert(AUTHORIZATION, value);
        }

        info!(url = %self.url, "connecting to backend");
        let (stream, _response) =
            connect_async(request)
                .await
                .map_err(|e| TransportError::ConnectionFailed {
                    url: self.url.clone(),
                    reason: e.to_string(),
                })?;
        let (sink, source) = stream.split();
        *self.shared.sink.lock().await = Some(sink);

        let (ready_tx, ready_rx) = oneshot::channel();
        tokio::spawn(read_loop(source, self.shared.clone(), ready_tx));

        self.transmit(&json!({ "action": "get_version_info", "echo": PROBE_ECHO }))
            .await
            .map_err(|e| TransportError::ConnectionClosed {
                reason: e.to_string(),
            })?;

        ready_rx
            .await
            .map_err(|_| TransportError::ConnectionClosed {
                reason: "socket closed before first frame".into(),
            })??;
        info!(url = %self.url, "connected to backend");
        Ok(())
    }
}

#[async_trait]
impl Transport for WsClientTransport {
    fn bind(&self, app: Arc<App>) {
        self.shared.core.bind(app);
    }

    async fn listen(&self) -> TransportResult<()> {
        if !self.shared.core.begin_listen() {
            return Ok(());
        }
        self.open().await?;
        self.shared.core.announce_connected().await;
        Ok(())
    }

    async fn close(&self) {
        let mut guard = self.shared.sink.lock().await;
        if let Some(mut sink) = guard.take() {
            let _ = sink.close().await;
            info!(url = %self.url, "ws client closed");
        }
        self.shared.set_state(ConnectionState::Closed);
    }
}

/// Processes inbound frames strictly in arrival order.
async fn read_loop(
    mut source: WsSource,
    shared: Arc<WsShared>,
    ready_tx: oneshot::Sender<TransportResult<()>>,
) {
    let mut ready = Some(ready_tx);

    while let Some(frame) = source.next().await {
        match frame {
            Ok(Message::Text(text)) => {
                let parsed: Value = match serde_json::from_str(text.as_str()) {
                    Ok(value) => value,
                    Err(e) => {
                        warn!(error = %e, len = text.len(), "skipping malformed frame");
                        continue;
                    }
                };
                if ready.is_some() {
                    shared.set_state(ConnectionState::Open);
                }
                route_frame(&shared, parsed).await;
                // Completed only after the frame is handled, so a sentinel
                // response is already recorded when `listen()` returns.
                if let Some(tx) = ready.take() {
                    let _ = tx.send(Ok(()));
                }
            }
            Ok(Message::Ping(data)) => {
                trace!("ping");
                let mut guard = shared.sink.lock().await;
                if let Some(sink) = guard.as_mut() {
                    let _ = sink.send(Message::Pong(data)).await;
                }
            }
            Ok(Message::Pong(_)) | Ok(Message::Binary(_)) | Ok(Message::Frame(_)) => {}
            Ok(Message::Close(_)) => {
                info!("backend closed connection");
                break;
            }
            Err(e) => {
                warn!(error = %e, "socket error");
                if let Some(tx) = ready.take() {
                    let _ = tx.send(Err(TransportError::ConnectionClosed {
                        reason: e.to_string(),
                    }));
                }
                break;
            }
        }
    }

    if let Some(tx) = ready.take() {
        let _ = tx.send(Err(TransportError::ConnectionClosed {
            reason: "stream ended before first frame".into(),
        }));
    }
    shared.set_state(ConnectionState::Closed);
    // Waiters on outstanding commands observe the closure.
    shared.pending.clear();
    *shared.sink.lock().await = None;
}

/// Routes one parsed frame: events go through the dispatch path, everything
/// else is treated as a command response.
async fn route_frame(shared: &WsShared, frame: Value) {
    if frame.get("post_type").is_some() {
        // Fire-and-forget: unroutable events are dropped silently, and the
        // forward is awaited here so sinks see events in arrival order.
        if let Ok(routed) = shared.core.route(frame) {
            routed.forward().await;
        }
        return;
    }

    match frame.get("echo").and_then(Value::as_i64) {
        Some(PROBE_ECHO) => {
            let info = frame
                .get("data")
                .cloned()
                .and_then(|data| serde_json::from_value::<VersionInfo>(data).ok());
            match info {
                Some(version) => {
                    debug!(app_name = %version.app_name, "recorded backend version info");
                    *shared.version.lock() = Some(version);
                }
                None => warn!("probe response carried no usable version info"),
            }
        }
        Some(echo) => {
            if !shared.pending.complete(echo, frame) {
                trace!(echo, "response with unknown echo ignored");
            }
        }
        None => trace!("frame without post_type or echo ignored"),
    }
}
