//! HTTP push receiver.
//!
//! The backend POSTs one JSON event per request, optionally signed with
//! `X-Signature: sha1=<hex-hmac-sha1-of-body>`. Responses are bare status
//! codes: 200 on dispatch, 400 for non-JSON bodies, 401 for a missing
//! signature, 403 for a bad signature or an unroutable identity.

use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    Router,
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    routing::post,
};
use hmac::{Hmac, Mac};
use sha1::Sha1;
use tokio::sync::oneshot;
use tracing::{debug, error, info, warn};

use solder_core::{App, TransportError, TransportResult, VersionInfo};

use crate::dispatch::DispatchCore;
use crate::traits::Transport;

/// Inbound push receiver for one listen port.
pub struct HttpPushTransport {
    core: Arc<DispatchCore>,
    port: u16,
    secret: Option<String>,
    verify_on_listen: bool,
    version: parking_lot::Mutex<Option<VersionInfo>>,
    shutdown: parking_lot::Mutex<Option<oneshot::Sender<()>>>,
}

/// Shared state for the request handler.
struct PushState {
    core: Arc<DispatchCore>,
    secret: Option<String>,
}

impl HttpPushTransport {
    /// Creates a receiver for `port`. `secret` enables signature
    /// verification; `verify_on_listen` makes `listen()` probe the backend
    /// through the first bound app's [`VersionProbe`](solder_core::VersionProbe).
    pub fn new(port: u16, secret: Option<String>, verify_on_listen: bool) -> Self {
        Self {
            core: Arc::new(DispatchCore::new()),
            port,
            secret,
            verify_on_listen,
            version: parking_lot::Mutex::new(None),
            shutdown: parking_lot::Mutex::new(None),
        }
    }

    /// The router serving the push endpoint, accepting POST on any path.
    ///
    /// Public so the receiver can be mounted into an existing axum app; the
    /// standalone server spawned by [`listen`](Transport::listen) uses the
    /// same router.
    pub fn router(&self) -> Router {
        let state = Arc::new(PushState {
            core: self.core.clone(),
            secret: self.secret.clone(),
        });
        Router::new()
            .route("/", post(push_handler))
            .route("/{*path}", post(push_handler))
            .with_state(state)
    }

    /// Version info recorded by the startup probe, if it ran.
    pub fn version(&self) -> Option<VersionInfo> {
        self.version.lock().clone()
    }
}

#[async_trait]
impl Transport for HttpPushTransport {
    fn bind(&self, app: Arc<App>) {
        self.core.bind(app);
    }

    async fn listen(&self) -> TransportResult<()> {
        if !self.core.begin_listen() {
            return Ok(());
        }

        let listener = tokio::net::TcpListener::bind(("0.0.0.0", self.port)).await?;
        let addr = listener.local_addr()?;
        info!(addr = %addr, "push receiver listening");

        let (shutdown_tx, mut shutdown_rx) = oneshot::channel();
        *self.shutdown.lock() = Some(shutdown_tx);

        let router = self.router();
        tokio::spawn(async move {
            let server = axum::serve(listener, router);
            tokio::select! {
                result = server => {
                    if let Err(e) = result {
                        error!(error = %e, "push receiver error");
                    }
                }
                _ = &mut shutdown_rx => {
                    info!("push receiver shutting down");
                }
            }
        });

        if self.verify_on_listen {
            self.run_startup_probe().await?;
        }

        self.core.announce_connected().await;
        Ok(())
    }

    async fn close(&self) {
        if let Some(tx) = self.shutdown.lock().take() {
            let _ = tx.send(());
        }
    }
}

impl HttpPushTransport {
    /// Confirms backend authorization by fetching version info through the
    /// first bound app's probe. A rejected or missing probe fails the whole
    /// `listen()`.
    async fn run_startup_probe(&self) -> TransportResult<()> {
        let probe = self.core.first_app().and_then(|app| app.probe().cloned());
        let Some(probe) = probe else {
            error!("verification required but no capability probe is attached");
            return Err(TransportError::AuthorizationFailed);
        };
        match probe.get_version_info().await {
            Ok(version) => {
                info!(app_name = %version.app_name, "backend capability probe succeeded");
                *self.version.lock() = Some(version);
                Ok(())
            }
            Err(e) => {
                error!(error = %e, "backend capability probe failed");
                Err(TransportError::AuthorizationFailed)
            }
        }
    }
}

async fn push_handler(
    State(state): State<Arc<PushState>>,
    headers: HeaderMap,
    body: Bytes,
) -> StatusCode {
    if let Some(secret) = &state.secret {
        let Some(signature) = headers.get("x-signature").and_then(|v| v.to_str().ok()) else {
            return StatusCode::UNAUTHORIZED;
        };
        if signature != body_signature(secret, &body) {
            warn!("rejecting push with mismatched signature");
            return StatusCode::FORBIDDEN;
        }
    }

    let Ok(payload) = serde_json::from_slice::<serde_json::Value>(&body) else {
        return StatusCode::BAD_REQUEST;
    };

    match state.core.route(payload) {
        Ok(routed) => {
            // Acknowledge before forwarding so a slow sink cannot hold up
            // the response.
            tokio::spawn(routed.forward());
            debug!("accepted push event");
            StatusCode::OK
        }
        Err(_) => StatusCode::FORBIDDEN,
    }
}

/// Computes the `X-Signature` value for a raw body.
fn body_signature(secret: &str, body: &[u8]) -> String {
    let mut mac =
        Hmac::<Sha1>::new_from_slice(secret.as_bytes()).expect("HMAC accepts any key length");
    mac.update(body);
    format!("sha1={}", hex::encode(mac.finalize().into_bytes()))
}
