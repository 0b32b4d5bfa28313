//! Identity registry: maps bot identities to the app instances that own them.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, info};

use crate::app::App;

/// The outcome of resolving an inbound identity.
#[derive(Debug, Clone)]
pub enum Resolution {
    /// The identity was already bound to this app.
    Known(Arc<App>),
    /// The identity was unclaimed and has just been bound to this app.
    /// The binding is permanent for the registry's lifetime.
    NewlyBound(Arc<App>),
    /// The identity is unclaimed and no unbound app remains to claim it.
    Unroutable,
}

/// Per-transport registry of app instances.
///
/// Instances registered without an identity form an ordered pool of
/// candidates; the first still-unbound one (in registration order) claims
/// the next unknown `selfId` that arrives.
#[derive(Default)]
pub struct AppRegistry {
    apps: Vec<Arc<App>>,
    bound: HashMap<i64, Arc<App>>,
}

impl AppRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an app as a dispatch target. Idempotent per instance.
    pub fn register(&mut self, app: Arc<App>) {
        if self.apps.iter().any(|a| Arc::ptr_eq(a, &app)) {
            return;
        }
        if let Some(self_id) = app.self_id() {
            debug!(self_id, "registering app with declared identity");
            self.bound.insert(self_id, app.clone());
        } else {
            debug!("registering app pending identity binding");
        }
        self.apps.push(app);
    }

    /// Resolves the owner of `self_id`, binding a candidate if necessary.
    pub fn resolve(&mut self, self_id: i64) -> Resolution {
        if let Some(app) = self.bound.get(&self_id) {
            return Resolution::Known(app.clone());
        }
        let Some(app) = self.apps.iter().find(|a| a.self_id().is_none()) else {
            return Resolution::Unroutable;
        };
        app.bind_self_id(self_id);
        self.bound.insert(self_id, app.clone());
        info!(self_id, "bound inbound identity to app instance");
        Resolution::NewlyBound(app.clone())
    }

    /// All registered apps, in registration order.
    pub fn apps(&self) -> &[Arc<App>] {
        &self.apps
    }

    /// The first registered app, if any.
    pub fn first(&self) -> Option<&Arc<App>> {
        self.apps.first()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;

    use super::*;
    use crate::app::EventSink;
    use crate::config::AppConfig;
    use crate::event::NormalizedEvent;

    #[derive(Default)]
    struct NullSink(AtomicUsize);

    #[async_trait]
    impl EventSink for NullSink {
        async fn connected(&self) {}
        async fn dispatch(&self, _event: NormalizedEvent) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn unbound_app() -> Arc<App> {
        Arc::new(App::new(AppConfig::default(), Arc::new(NullSink::default())))
    }

    fn bound_app(self_id: i64) -> Arc<App> {
        let config = AppConfig {
            self_id: Some(self_id),
            ..Default::default()
        };
        Arc::new(App::new(config, Arc::new(NullSink::default())))
    }

    #[test]
    fn test_declared_identity_resolves_known() {
        let mut registry = AppRegistry::new();
        let app = bound_app(514);
        registry.register(app.clone());

        match registry.resolve(514) {
            Resolution::Known(resolved) => assert!(Arc::ptr_eq(&resolved, &app)),
            other => panic!("expected Known, got {other:?}"),
        }
    }

    #[test]
    fn test_binding_follows_registration_order() {
        let mut registry = AppRegistry::new();
        let first = unbound_app();
        let second = unbound_app();
        registry.register(first.clone());
        registry.register(second.clone());

        match registry.resolve(100) {
            Resolution::NewlyBound(app) => assert!(Arc::ptr_eq(&app, &first)),
            other => panic!("expected NewlyBound, got {other:?}"),
        }
        assert_eq!(first.self_id(), Some(100));
        assert_eq!(second.self_id(), None);

        match registry.resolve(200) {
            Resolution::NewlyBound(app) => assert!(Arc::ptr_eq(&app, &second)),
            other => panic!("expected NewlyBound, got {other:?}"),
        }

        // Bindings are permanent.
        match registry.resolve(100) {
            Resolution::Known(app) => assert!(Arc::ptr_eq(&app, &first)),
            other => panic!("expected Known, got {other:?}"),
        }
    }

    #[test]
    fn test_unroutable_when_no_candidate_remains() {
        let mut registry = AppRegistry::new();
        registry.register(bound_app(514));

        assert!(matches!(registry.resolve(999), Resolution::Unroutable));
    }

    #[test]
    fn test_register_is_idempotent() {
        let mut registry = AppRegistry::new();
        let app = unbound_app();
        registry.register(app.clone());
        registry.register(app.clone());

        assert_eq!(registry.apps().len(), 1);

        // A single instance claims a single identity.
        assert!(matches!(registry.resolve(1), Resolution::NewlyBound(_)));
        assert!(matches!(registry.resolve(2), Resolution::Unroutable));
    }
}
