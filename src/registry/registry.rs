use chrono::Utc;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::Arc;

use super::types::{ConnectionHandle, ConnectionId};

/// Tracks all currently joined connections.
///
/// This is the single source of truth for membership: an id is present if and
/// only if a join has been admitted and no leave has since been processed.
/// All admission and removal goes through [`join`](Self::join) and
/// [`leave`](Self::leave) so the duplicate-join guard holds globally.
pub struct ConnectionRegistry {
    /// connection_id -> ConnectionHandle
    connections: DashMap<ConnectionId, Arc<ConnectionHandle>>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self {
            connections: DashMap::new(),
        }
    }

    /// Admit a connection. Returns `false` without any state change when the
    /// id is already live. The check-then-insert runs under the shard lock of
    /// the entry, so two racing joins of the same id can never both be
    /// admitted.
    pub fn join(&self, handle: Arc<ConnectionHandle>) -> bool {
        match self.connections.entry(handle.id) {
            Entry::Occupied(_) => false,
            Entry::Vacant(entry) => {
                entry.insert(handle);
                true
            }
        }
    }

    /// Remove a connection, returning whether it was present. Leaving an id
    /// that is not live is a no-op, not an error.
    pub fn leave(&self, connection_id: ConnectionId) -> bool {
        self.connections.remove(&connection_id).is_some()
    }

    pub fn contains(&self, connection_id: ConnectionId) -> bool {
        self.connections.contains_key(&connection_id)
    }

    /// Get connection by ID
    pub fn get(&self, connection_id: ConnectionId) -> Option<Arc<ConnectionHandle>> {
        self.connections.get(&connection_id).map(|h| h.clone())
    }

    /// Snapshot of all live connections, used as the fan-out target set.
    pub fn members(&self) -> Vec<Arc<ConnectionHandle>> {
        self.connections.iter().map(|r| r.value().clone()).collect()
    }

    /// Snapshot of all live connection ids (for diagnostics and heartbeat)
    pub fn member_ids(&self) -> Vec<ConnectionId> {
        self.connections.iter().map(|r| *r.key()).collect()
    }

    /// Number of live connections; observability only.
    pub fn count(&self) -> usize {
        self.connections.len()
    }

    /// Get statistics
    pub fn stats(&self) -> RegistryStats {
        RegistryStats {
            total_connections: self.connections.len(),
        }
    }

    /// Find connections that have been inactive for longer than the timeout
    pub fn find_stale(&self, timeout_secs: u64) -> Vec<ConnectionId> {
        let now = Utc::now();
        let timeout = chrono::Duration::seconds(timeout_secs as i64);

        self.connections
            .iter()
            .filter(|entry| now.signed_duration_since(entry.value().last_activity()) > timeout)
            .map(|entry| *entry.key())
            .collect()
    }
}

impl Default for ConnectionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct RegistryStats {
    pub total_connections: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;
    use uuid::Uuid;

    fn test_handle(id: ConnectionId) -> Arc<ConnectionHandle> {
        let (tx, _rx) = mpsc::channel(8);
        Arc::new(ConnectionHandle::new(id, tx))
    }

    #[test]
    fn test_join_and_leave() {
        let registry = ConnectionRegistry::new();
        let id = Uuid::new_v4();

        assert!(registry.join(test_handle(id)));
        assert!(registry.contains(id));
        assert_eq!(registry.count(), 1);

        assert!(registry.leave(id));
        assert!(!registry.contains(id));
        assert_eq!(registry.count(), 0);
    }

    #[test]
    fn test_duplicate_join_rejected() {
        let registry = ConnectionRegistry::new();
        let id = Uuid::new_v4();

        assert!(registry.join(test_handle(id)));
        assert!(!registry.join(test_handle(id)));

        let ids = registry.member_ids();
        assert_eq!(ids.iter().filter(|m| **m == id).count(), 1);
    }

    #[test]
    fn test_redundant_leave_is_noop() {
        let registry = ConnectionRegistry::new();
        assert!(!registry.leave(Uuid::new_v4()));
        assert_eq!(registry.count(), 0);
    }

    #[test]
    fn test_members_matches_count() {
        let registry = ConnectionRegistry::new();
        for _ in 0..5 {
            registry.join(test_handle(Uuid::new_v4()));
        }
        assert_eq!(registry.members().len(), registry.count());
        assert_eq!(registry.stats().total_connections, 5);
    }

    #[test]
    fn test_find_stale_ignores_active_connections() {
        let registry = ConnectionRegistry::new();
        registry.join(test_handle(Uuid::new_v4()));

        let stale = registry.find_stale(60);
        assert!(stale.is_empty());
    }
}
