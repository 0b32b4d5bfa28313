//! The transport contract shared by both adapters.

use std::sync::Arc;

use async_trait::async_trait;

use solder_core::{App, TransportResult};

/// A transport endpoint that app instances can be attached to.
///
/// Implementations share the dispatch path in [`dispatch`](crate::dispatch)
/// and differ only in how raw payloads reach it.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Registers an app as a dispatch target. Idempotent per instance.
    ///
    /// An app whose configuration declares a `self_id` is routable
    /// immediately; otherwise it becomes a candidate for late binding, in
    /// registration order.
    fn bind(&self, app: Arc<App>);

    /// Performs transport setup, then notifies every bound app's sink with a
    /// `connected` lifecycle event.
    ///
    /// One-shot: a second call is a no-op that returns `Ok(())`. Setup
    /// failures propagate to the caller.
    async fn listen(&self) -> TransportResult<()>;

    /// Releases transport resources. Idempotent; safe to call when never
    /// opened.
    async fn close(&self);
}
