//! Application instances and the collaborator seams around them.

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;

use crate::api::VersionInfo;
use crate::config::AppConfig;
use crate::error::CommandError;
use crate::event::NormalizedEvent;

/// The host's event registry, as seen from the transport layer.
///
/// One sink belongs to one [`App`]. The transports call `connected` exactly
/// once per app after a successful `listen()`, and `dispatch` once per
/// inbound event routed to that app.
#[async_trait]
pub trait EventSink: Send + Sync {
    /// Transport-level lifecycle notification.
    async fn connected(&self);

    /// Delivers one normalized event.
    async fn dispatch(&self, event: NormalizedEvent);
}

/// The host's outbound command sender, reduced to the startup capability
/// probe the transports need.
#[async_trait]
pub trait VersionProbe: Send + Sync {
    /// Fetches backend version/capability info.
    async fn get_version_info(&self) -> Result<VersionInfo, CommandError>;
}

/// One logical bot identity's runtime context.
///
/// The identity may be unknown at construction time; it is bound at most
/// once, either from configuration or by the registry when an event with an
/// unclaimed `selfId` arrives.
pub struct App {
    config: AppConfig,
    self_id: RwLock<Option<i64>>,
    sink: Arc<dyn EventSink>,
    probe: Option<Arc<dyn VersionProbe>>,
}

impl App {
    /// Creates an app instance. The identity starts out as whatever the
    /// configuration declares.
    pub fn new(config: AppConfig, sink: Arc<dyn EventSink>) -> Self {
        Self {
            self_id: RwLock::new(config.self_id),
            config,
            sink,
            probe: None,
        }
    }

    /// Attaches the capability-probe collaborator.
    pub fn with_probe(mut self, probe: Arc<dyn VersionProbe>) -> Self {
        self.probe = Some(probe);
        self
    }

    /// The currently bound identity, if any.
    pub fn self_id(&self) -> Option<i64> {
        *self.self_id.read()
    }

    /// Fixes the identity. Only the registry performs this transition.
    pub(crate) fn bind_self_id(&self, self_id: i64) {
        *self.self_id.write() = Some(self_id);
    }

    /// The instance configuration.
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// The event registry collaborator.
    pub fn sink(&self) -> &Arc<dyn EventSink> {
        &self.sink
    }

    /// The capability-probe collaborator, if attached.
    pub fn probe(&self) -> Option<&Arc<dyn VersionProbe>> {
        self.probe.as_ref()
    }
}

impl std::fmt::Debug for App {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("App")
            .field("self_id", &self.self_id())
            .field("transport", &self.config.transport)
            .field("has_probe", &self.probe.is_some())
            .finish()
    }
}
