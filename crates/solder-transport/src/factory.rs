//! Transport construction and endpoint-keyed sharing.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tracing::debug;

use solder_core::{App, ConfigError, TransportKind};

use crate::correlation::EchoSequence;
use crate::http::HttpPushTransport;
use crate::traits::Transport;
use crate::websocket::WsClientTransport;

/// Builds transports from app configuration and shares them by endpoint.
///
/// Apps configured with the same listen port (HTTP) or backend URL
/// (WebSocket) end up bound to the same transport instance. The first app to
/// name an endpoint supplies the transport-wide options (secret, token,
/// verification flag, command timeout).
#[derive(Default)]
pub struct TransportRegistry {
    http: Mutex<HashMap<u16, Arc<HttpPushTransport>>>,
    ws: Mutex<HashMap<String, Arc<WsClientTransport>>>,
    echo_seq: EchoSequence,
}

impl TransportRegistry {
    /// Creates an empty registry with a fresh echo sequence.
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolves the transport for `app`, constructing it if the endpoint is
    /// new, and binds the app to it.
    pub fn attach(&self, app: Arc<App>) -> Result<Arc<dyn Transport>, ConfigError> {
        let kind = app.config().transport.ok_or(ConfigError::MissingKind)?;
        match kind {
            TransportKind::Http => {
                let port = app.config().port.ok_or(ConfigError::MissingField("port"))?;
                let transport = self
                    .http
                    .lock()
                    .entry(port)
                    .or_insert_with(|| {
                        debug!(port, "creating http push transport");
                        Arc::new(HttpPushTransport::new(
                            port,
                            app.config().secret.clone(),
                            app.config().verify_on_listen,
                        ))
                    })
                    .clone();
                transport.bind(app);
                Ok(transport)
            }
            TransportKind::Ws => {
                let url = app
                    .config()
                    .server_url
                    .clone()
                    .ok_or(ConfigError::MissingField("server_url"))?;
                let transport = self
                    .ws
                    .lock()
                    .entry(url.clone())
                    .or_insert_with(|| {
                        debug!(url = %url, "creating ws client transport");
                        Arc::new(WsClientTransport::new(
                            url.clone(),
                            app.config().access_token.clone(),
                            self.echo_seq.clone(),
                            Duration::from_millis(app.config().command_timeout_ms),
                        ))
                    })
                    .clone();
                transport.bind(app);
                Ok(transport)
            }
        }
    }

    /// The WebSocket transport for `url`, if one has been constructed.
    /// Useful for issuing [`send`](WsClientTransport::send) calls.
    pub fn ws_transport(&self, url: &str) -> Option<Arc<WsClientTransport>> {
        self.ws.lock().get(url).cloned()
    }

    /// The HTTP transport listening on `port`, if one has been constructed.
    pub fn http_transport(&self, port: u16) -> Option<Arc<HttpPushTransport>> {
        self.http.lock().get(&port).cloned()
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;

    use super::*;
    use solder_core::{AppConfig, EventSink, NormalizedEvent};

    struct NullSink;

    #[async_trait]
    impl EventSink for NullSink {
        async fn connected(&self) {}
        async fn dispatch(&self, _event: NormalizedEvent) {}
    }

    fn app(config: AppConfig) -> Arc<App> {
        Arc::new(App::new(config, Arc::new(NullSink)))
    }

    #[test]
    fn test_missing_kind() {
        let registry = TransportRegistry::new();
        let result = registry.attach(app(AppConfig::default()));
        assert_eq!(result.err(), Some(ConfigError::MissingKind));
    }

    #[test]
    fn test_missing_required_field() {
        let registry = TransportRegistry::new();

        let result = registry.attach(app(AppConfig {
            transport: Some(TransportKind::Http),
            ..Default::default()
        }));
        assert_eq!(result.err(), Some(ConfigError::MissingField("port")));

        let result = registry.attach(app(AppConfig {
            transport: Some(TransportKind::Ws),
            ..Default::default()
        }));
        assert_eq!(result.err(), Some(ConfigError::MissingField("server_url")));
    }

    #[test]
    fn test_same_endpoint_shares_instance() {
        let registry = TransportRegistry::new();
        let config = AppConfig {
            transport: Some(TransportKind::Http),
            port: Some(5700),
            ..Default::default()
        };

        let first = registry.attach(app(config.clone())).unwrap();
        let second = registry.attach(app(config)).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn test_distinct_endpoints_get_distinct_instances() {
        let registry = TransportRegistry::new();

        let first = registry
            .attach(app(AppConfig {
                transport: Some(TransportKind::Ws),
                server_url: Some("ws://127.0.0.1:6700".into()),
                ..Default::default()
            }))
            .unwrap();
        let second = registry
            .attach(app(AppConfig {
                transport: Some(TransportKind::Ws),
                server_url: Some("ws://127.0.0.1:6701".into()),
                ..Default::default()
            }))
            .unwrap();

        assert!(!Arc::ptr_eq(&first, &second));
        assert!(registry.ws_transport("ws://127.0.0.1:6700").is_some());
        assert!(registry.ws_transport("ws://127.0.0.1:6702").is_none());
    }
}
