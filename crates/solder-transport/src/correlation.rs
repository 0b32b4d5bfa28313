//! Command/response correlation for the WebSocket transport.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};

use parking_lot::Mutex;
use serde_json::Value;
use tokio::sync::oneshot;

/// Monotonic source of `echo` ids.
///
/// One sequence is shared by every WebSocket transport in a process (the
/// factory injects its own into each one it constructs), so outstanding
/// commands are unique across connections. Ids start at 1; the sentinel `-1`
/// is reserved for the startup probe.
#[derive(Clone)]
pub struct EchoSequence(Arc<AtomicI64>);

impl EchoSequence {
    /// Creates a sequence starting at 1.
    pub fn new() -> Self {
        Self(Arc::new(AtomicI64::new(1)))
    }

    /// Returns the next id.
    pub fn next_id(&self) -> i64 {
        self.0.fetch_add(1, Ordering::SeqCst)
    }
}

impl Default for EchoSequence {
    fn default() -> Self {
        Self::new()
    }
}

/// Outstanding commands awaiting their correlated response.
#[derive(Default)]
pub(crate) struct PendingCommands {
    waiters: Mutex<HashMap<i64, oneshot::Sender<Value>>>,
}

impl PendingCommands {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Registers a waiter for `echo` and returns the receiving half.
    pub(crate) fn register(&self, echo: i64) -> oneshot::Receiver<Value> {
        let (tx, rx) = oneshot::channel();
        self.waiters.lock().insert(echo, tx);
        rx
    }

    /// Completes the waiter for `echo` with the full response, if one is
    /// registered. Returns whether a waiter was found.
    pub(crate) fn complete(&self, echo: i64, response: Value) -> bool {
        match self.waiters.lock().remove(&echo) {
            Some(tx) => {
                let _ = tx.send(response);
                true
            }
            None => false,
        }
    }

    /// Evicts the waiter for `echo` without completing it.
    pub(crate) fn discard(&self, echo: i64) {
        self.waiters.lock().remove(&echo);
    }

    /// Drops every waiter; their receivers observe closure.
    pub(crate) fn clear(&self) {
        self.waiters.lock().clear();
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.waiters.lock().len()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_sequence_is_strictly_increasing() {
        let seq = EchoSequence::new();
        let a = seq.next_id();
        let b = seq.next_id();
        let c = seq.clone().next_id();
        assert!(a < b && b < c);
        assert!(a >= 1, "sequence must never produce the probe sentinel");
    }

    #[tokio::test]
    async fn test_complete_resolves_matching_waiter() {
        let pending = PendingCommands::new();
        let rx = pending.register(7);

        assert!(!pending.complete(8, json!({ "echo": 8 })));
        assert!(pending.complete(7, json!({ "echo": 7, "data": 1 })));

        let response = rx.await.unwrap();
        assert_eq!(response["data"], json!(1));
        assert_eq!(pending.len(), 0);
    }

    #[tokio::test]
    async fn test_clear_closes_waiters() {
        let pending = PendingCommands::new();
        let rx = pending.register(1);
        pending.clear();
        assert!(rx.await.is_err());
    }

    #[test]
    fn test_discard_removes_waiter() {
        let pending = PendingCommands::new();
        let _rx = pending.register(3);
        pending.discard(3);
        assert!(!pending.complete(3, json!({})));
    }
}
