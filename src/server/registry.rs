//! The cid-keyed connection registry, grounded directly on the teacher's
//! `TunnelService` (`parking_lot::Mutex<HashMap<...>>`): a plain sync mutex
//! guarding a `HashMap`, since every operation on it is a quick insert/
//! remove/lookup that never spans an `.await`.

use crate::tunnel::Channel;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Everything the HTTP handlers need to know about one `cid`.
pub struct ConnectionRecord {
    pub channel: Arc<Channel>,
    /// Cancelled on DELETE, or when the underlying TCP side closes on its
    /// own; handlers use this only to decide whether a cid still exists.
    pub shutdown: CancellationToken,
}

#[derive(Default)]
pub struct Registry {
    connections: Mutex<HashMap<String, ConnectionRecord>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a freshly minted `cid`. Returns `false` on the vanishingly
    /// unlikely event of a UUID collision with a still-live entry.
    pub fn insert(&self, cid: String, record: ConnectionRecord) -> bool {
        let mut guard = self.connections.lock();
        if guard.contains_key(&cid) {
            return false;
        }
        guard.insert(cid, record);
        true
    }

    /// Looks up a live channel by `cid`. `None` for an unknown or already
    /// torn-down `cid` — callers treat that as a no-op, not an error.
    pub fn channel(&self, cid: &str) -> Option<Arc<Channel>> {
        let guard = self.connections.lock();
        guard.get(cid).map(|record| record.channel.clone())
    }

    /// Looks up a live channel and its shutdown token together, so a caller
    /// that suspends on the channel (the GET handler's long poll) can race
    /// that suspension against a concurrent DELETE instead of blocking past
    /// it forever.
    pub fn channel_and_shutdown(&self, cid: &str) -> Option<(Arc<Channel>, CancellationToken)> {
        let guard = self.connections.lock();
        guard
            .get(cid)
            .map(|record| (record.channel.clone(), record.shutdown.clone()))
    }

    /// Removes and tears down the entry for `cid`, if it still exists.
    pub fn remove(&self, cid: &str) {
        let removed = self.connections.lock().remove(cid);
        if let Some(record) = removed {
            record.shutdown.cancel();
        }
    }

    /// Drops every entry, cancelling each one's shutdown token. Used on
    /// graceful shutdown of the whole server.
    pub fn close_all(&self) {
        let mut guard = self.connections.lock();
        for (_, record) in guard.drain() {
            record.shutdown.cancel();
        }
    }

    pub fn len(&self) -> usize {
        self.connections.lock().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> ConnectionRecord {
        ConnectionRecord {
            channel: Arc::new(Channel::new()),
            shutdown: CancellationToken::new(),
        }
    }

    #[test]
    fn unknown_cid_lookup_returns_none() {
        let registry = Registry::new();
        assert!(registry.channel("does-not-exist").is_none());
    }

    #[test]
    fn insert_rejects_collision() {
        let registry = Registry::new();
        assert!(registry.insert("cid-1".to_string(), record()));
        assert!(!registry.insert("cid-1".to_string(), record()));
    }

    #[test]
    fn lookup_after_remove_returns_none() {
        let registry = Registry::new();
        registry.insert("cid-1".to_string(), record());
        assert!(registry.channel("cid-1").is_some());
        registry.remove("cid-1");
        assert!(registry.channel("cid-1").is_none());
    }

    #[test]
    fn remove_cancels_shutdown_token() {
        let registry = Registry::new();
        let token = CancellationToken::new();
        registry.insert(
            "cid-1".to_string(),
            ConnectionRecord {
                channel: Arc::new(Channel::new()),
                shutdown: token.clone(),
            },
        );
        registry.remove("cid-1");
        assert!(token.is_cancelled());
    }

    #[test]
    fn remove_unknown_cid_is_a_no_op() {
        let registry = Registry::new();
        registry.remove("does-not-exist");
        assert_eq!(registry.len(), 0);
    }
}
