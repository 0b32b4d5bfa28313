//! The dispatch path shared by both transports.
//!
//! Every inbound payload follows the same pipeline: normalize field names,
//! extract `selfId`, resolve (or late-bind) the owning app, then forward the
//! event to that app's sink. The two transports differ only in how they
//! acknowledge the outcome: the HTTP receiver answers with a status code
//! before forwarding, the WebSocket client has nothing to acknowledge.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;
use serde_json::Value;
use tracing::{debug, warn};

use solder_core::{App, AppRegistry, NormalizedEvent, Resolution};

/// Why a payload could not be routed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum RouteError {
    /// The payload carries no resolvable `selfId`.
    MissingSelfId,
    /// The identity is unclaimed and every registered app is already bound.
    NoCandidate,
}

/// An event together with the app that owns it.
pub(crate) struct RoutedEvent {
    app: Arc<App>,
    event: NormalizedEvent,
}

impl RoutedEvent {
    /// Forwards the event to the owning app's sink.
    pub(crate) async fn forward(self) {
        self.app.sink().dispatch(self.event).await;
    }
}

/// Registry plus listen-once state, composed into each transport.
#[derive(Default)]
pub(crate) struct DispatchCore {
    registry: Mutex<AppRegistry>,
    listening: AtomicBool,
}

impl DispatchCore {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn bind(&self, app: Arc<App>) {
        self.registry.lock().register(app);
    }

    /// Claims the one-shot listen slot. Returns `false` if some call already
    /// claimed it.
    pub(crate) fn begin_listen(&self) -> bool {
        !self.listening.swap(true, Ordering::SeqCst)
    }

    /// Notifies every bound app that the transport is up.
    pub(crate) async fn announce_connected(&self) {
        let apps: Vec<Arc<App>> = self.registry.lock().apps().to_vec();
        for app in apps {
            app.sink().connected().await;
        }
    }

    /// The first bound app; its configuration drives transport-wide options.
    pub(crate) fn first_app(&self) -> Option<Arc<App>> {
        self.registry.lock().first().cloned()
    }

    /// Normalizes a raw payload and resolves its owning app.
    ///
    /// On failure no sink is notified; the caller decides whether the
    /// protocol surfaces anything (HTTP answers 403, WebSocket stays silent).
    pub(crate) fn route(&self, raw: Value) -> Result<RoutedEvent, RouteError> {
        let event = NormalizedEvent::from_wire(raw);
        let Some(self_id) = event.self_id() else {
            warn!("dropping payload without a resolvable selfId");
            return Err(RouteError::MissingSelfId);
        };
        let resolution = self.registry.lock().resolve(self_id);
        let app = match resolution {
            Resolution::Known(app) | Resolution::NewlyBound(app) => app,
            Resolution::Unroutable => {
                warn!(self_id, "dropping event for unclaimed identity");
                return Err(RouteError::NoCandidate);
            }
        };
        debug!(self_id, post_type = ?event.post_type(), "routed inbound event");
        Ok(RoutedEvent { app, event })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use serde_json::json;

    use super::*;
    use solder_core::{AppConfig, EventSink};

    #[derive(Default)]
    struct CountingSink {
        dispatched: AtomicUsize,
        connected: AtomicUsize,
    }

    #[async_trait]
    impl EventSink for CountingSink {
        async fn connected(&self) {
            self.connected.fetch_add(1, Ordering::SeqCst);
        }
        async fn dispatch(&self, _event: NormalizedEvent) {
            self.dispatched.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn app_with_sink(self_id: Option<i64>) -> (Arc<App>, Arc<CountingSink>) {
        let sink = Arc::new(CountingSink::default());
        let config = AppConfig {
            self_id,
            ..Default::default()
        };
        (Arc::new(App::new(config, sink.clone())), sink)
    }

    #[tokio::test]
    async fn test_route_and_forward() {
        let core = DispatchCore::new();
        let (app, sink) = app_with_sink(Some(514));
        core.bind(app);

        let routed = core
            .route(json!({ "post_type": "message", "self_id": 514 }))
            .unwrap();
        routed.forward().await;

        assert_eq!(sink.dispatched.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_route_failures_touch_no_sink() {
        let core = DispatchCore::new();
        let (app, sink) = app_with_sink(Some(514));
        core.bind(app);

        assert_eq!(
            core.route(json!({ "post_type": "message" })).err(),
            Some(RouteError::MissingSelfId)
        );
        assert_eq!(
            core.route(json!({ "post_type": "message", "self_id": 999 }))
                .err(),
            Some(RouteError::NoCandidate)
        );
        assert_eq!(sink.dispatched.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_begin_listen_is_one_shot() {
        let core = DispatchCore::new();
        assert!(core.begin_listen());
        assert!(!core.begin_listen());
    }

    #[tokio::test]
    async fn test_announce_reaches_every_app() {
        let core = DispatchCore::new();
        let (first, first_sink) = app_with_sink(None);
        let (second, second_sink) = app_with_sink(Some(2));
        core.bind(first);
        core.bind(second);

        core.announce_connected().await;

        assert_eq!(first_sink.connected.load(Ordering::SeqCst), 1);
        assert_eq!(second_sink.connected.load(Ordering::SeqCst), 1);
    }
}
