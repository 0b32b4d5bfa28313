//! # Solder Core
//!
//! Domain types for the Solder gateway: application instances, the identity
//! registry, normalized wire events, configuration, and the error taxonomy.
//!
//! The gateway connects a bot-automation host to an OneBot v11 backend.
//! Every inbound payload carries a `self_id` naming the bot account it
//! belongs to; this crate owns the machinery that maps that identity to the
//! [`App`] which should receive the event.
//!
//! ## Collaborator seams
//!
//! Two traits mark the boundaries of this crate:
//!
//! - [`EventSink`] — the host's event registry. The transport layer pushes
//!   normalized events and lifecycle notifications through it.
//! - [`VersionProbe`] — the host's outbound command sender, reduced to the
//!   one call the transports need at startup (`get_version_info`).
//!
//! ```rust,ignore
//! use solder_core::{App, AppConfig, EventSink, NormalizedEvent};
//!
//! struct Registry;
//!
//! #[async_trait::async_trait]
//! impl EventSink for Registry {
//!     async fn connected(&self) {}
//!     async fn dispatch(&self, event: NormalizedEvent) {
//!         println!("{:?}", event.post_type());
//!     }
//! }
//!
//! let app = App::new(AppConfig::default(), std::sync::Arc::new(Registry));
//! ```

mod api;
mod app;
mod config;
mod error;
mod event;
mod registry;

pub use api::VersionInfo;
pub use app::{App, EventSink, VersionProbe};
pub use config::{AppConfig, TransportKind, default_command_timeout_ms};
pub use error::{CommandError, ConfigError, TransportError, TransportResult};
pub use event::NormalizedEvent;
pub use registry::{AppRegistry, Resolution};
