use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::mpsc;

use crate::metrics::RelayMetrics;
use crate::registry::{ConnectionHandle, ConnectionId, ConnectionRegistry};
use crate::websocket::{OutboundMessage, ServerMessage};

use super::types::{DeliveryReport, JoinError};

/// Threshold for pre-serializing the broadcast frame once instead of per member
const PRESERIALIZATION_THRESHOLD: usize = 4;

/// Statistics for the broadcast hub
#[derive(Debug, Default)]
pub struct HubStats {
    /// Messages accepted and fanned out
    pub messages_relayed: AtomicU64,
    /// Successful per-member deliveries
    pub total_delivered: AtomicU64,
    /// Failed per-member deliveries
    pub total_failed: AtomicU64,
    /// Messages dropped because the sender was not joined
    pub unknown_sender_drops: AtomicU64,
    /// Joins refused by the duplicate guard
    pub duplicate_joins: AtomicU64,
    /// Admitted joins
    pub joins: AtomicU64,
    /// Processed leaves
    pub leaves: AtomicU64,
}

impl HubStats {
    pub fn snapshot(&self) -> HubStatsSnapshot {
        HubStatsSnapshot {
            messages_relayed: self.messages_relayed.load(Ordering::Relaxed),
            total_delivered: self.total_delivered.load(Ordering::Relaxed),
            total_failed: self.total_failed.load(Ordering::Relaxed),
            unknown_sender_drops: self.unknown_sender_drops.load(Ordering::Relaxed),
            duplicate_joins: self.duplicate_joins.load(Ordering::Relaxed),
            joins: self.joins.load(Ordering::Relaxed),
            leaves: self.leaves.load(Ordering::Relaxed),
        }
    }
}

/// Snapshot of hub statistics
#[derive(Debug, Clone, Serialize)]
pub struct HubStatsSnapshot {
    pub messages_relayed: u64,
    pub total_delivered: u64,
    pub total_failed: u64,
    pub unknown_sender_drops: u64,
    pub duplicate_joins: u64,
    pub joins: u64,
    pub leaves: u64,
}

/// Relays messages between connected clients.
///
/// Each connection moves through pending -> joined -> left. A connection is
/// pending between transport accept and [`on_join`](Self::on_join) returning,
/// joined while its id is in the registry, and left (terminal) afterwards.
/// Membership is only ever consulted and mutated through the registry.
pub struct BroadcastHub {
    registry: Arc<ConnectionRegistry>,
    stats: HubStats,
}

impl BroadcastHub {
    pub fn new(registry: Arc<ConnectionRegistry>) -> Self {
        Self {
            registry,
            stats: HubStats::default(),
        }
    }

    /// Get hub statistics
    pub fn stats(&self) -> HubStatsSnapshot {
        self.stats.snapshot()
    }

    /// Admit a connection and return its handle.
    ///
    /// A duplicate id is refused without side effects; the caller must not
    /// register message or leave handlers for the rejected attempt.
    pub fn on_join(
        &self,
        connection_id: ConnectionId,
        sender: mpsc::Sender<OutboundMessage>,
    ) -> Result<Arc<ConnectionHandle>, JoinError> {
        let handle = Arc::new(ConnectionHandle::new(connection_id, sender));

        if !self.registry.join(handle.clone()) {
            self.stats.duplicate_joins.fetch_add(1, Ordering::Relaxed);
            RelayMetrics::record_duplicate_join();
            tracing::warn!(
                connection_id = %connection_id,
                "Duplicate join refused"
            );
            return Err(JoinError::Duplicate { id: connection_id });
        }

        self.stats.joins.fetch_add(1, Ordering::Relaxed);
        tracing::info!(connection_id = %connection_id, "Connection joined");
        Ok(handle)
    }

    /// Relay a message from `sender_id` to every currently joined connection,
    /// the sender included.
    ///
    /// A message from an id that is not joined indicates a race with a leave
    /// or a rejected duplicate; it is dropped without fan-out and without an
    /// error to the caller. Delivery is one non-blocking queue push per
    /// member, so a full or closed queue fails that member alone.
    #[tracing::instrument(
        name = "hub.relay",
        skip(self, payload),
        fields(sender_id = %sender_id)
    )]
    pub fn on_message(&self, sender_id: ConnectionId, payload: serde_json::Value) -> DeliveryReport {
        if !self.registry.contains(sender_id) {
            self.stats.unknown_sender_drops.fetch_add(1, Ordering::Relaxed);
            RelayMetrics::record_dropped();
            tracing::debug!(
                sender_id = %sender_id,
                "Dropping message from connection that is not joined"
            );
            return DeliveryReport::dropped();
        }

        let members = self.registry.members();
        let message = ServerMessage::relayed(sender_id, payload);

        // Serialize once and share across all members for larger fan-outs
        let outbound = if members.len() >= PRESERIALIZATION_THRESHOLD {
            match OutboundMessage::preserialized(&message) {
                Ok(msg) => msg,
                Err(e) => {
                    tracing::error!(error = %e, "Failed to pre-serialize message, falling back to per-connection serialization");
                    OutboundMessage::Raw(message)
                }
            }
        } else {
            OutboundMessage::Raw(message)
        };

        let mut delivered = 0;
        let mut failed = 0;

        for conn in &members {
            match conn.try_send(outbound.clone()) {
                Ok(()) => delivered += 1,
                Err(_) => {
                    failed += 1;
                    tracing::debug!(
                        connection_id = %conn.id,
                        "Delivery failed, connection queue full or closed"
                    );
                }
            }
        }

        self.stats.messages_relayed.fetch_add(1, Ordering::Relaxed);
        self.stats
            .total_delivered
            .fetch_add(delivered as u64, Ordering::Relaxed);
        self.stats
            .total_failed
            .fetch_add(failed as u64, Ordering::Relaxed);

        RelayMetrics::record_relayed();
        RelayMetrics::record_delivered(delivered as u64);
        RelayMetrics::record_failed(failed as u64);

        tracing::debug!(
            sender_id = %sender_id,
            delivered = delivered,
            failed = failed,
            "Relayed message to all members"
        );

        DeliveryReport::new(delivered, failed)
    }

    /// Remove a connection. Idempotent regardless of prior state; a leave for
    /// an id that is not live returns `false` and changes nothing.
    pub fn on_leave(&self, connection_id: ConnectionId) -> bool {
        let removed = self.registry.leave(connection_id);

        if removed {
            self.stats.leaves.fetch_add(1, Ordering::Relaxed);
            tracing::info!(connection_id = %connection_id, "Connection left");
        } else {
            tracing::debug!(
                connection_id = %connection_id,
                "Ignoring leave for connection that is not joined"
            );
        }

        removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use uuid::Uuid;

    fn test_hub() -> BroadcastHub {
        BroadcastHub::new(Arc::new(ConnectionRegistry::new()))
    }

    #[tokio::test]
    async fn test_duplicate_join_counted() {
        let hub = test_hub();
        let id = Uuid::new_v4();
        let (tx1, _rx1) = mpsc::channel(8);
        let (tx2, _rx2) = mpsc::channel(8);

        assert!(hub.on_join(id, tx1).is_ok());
        assert!(matches!(
            hub.on_join(id, tx2),
            Err(JoinError::Duplicate { .. })
        ));

        let stats = hub.stats();
        assert_eq!(stats.joins, 1);
        assert_eq!(stats.duplicate_joins, 1);
    }

    #[tokio::test]
    async fn test_message_from_unjoined_sender_dropped() {
        let hub = test_hub();

        let report = hub.on_message(Uuid::new_v4(), json!({"text": "hi"}));

        assert!(!report.relayed);
        assert_eq!(report.delivered_to, 0);
        assert_eq!(hub.stats().unknown_sender_drops, 1);
    }

    #[tokio::test]
    async fn test_leave_is_idempotent() {
        let hub = test_hub();
        let id = Uuid::new_v4();
        let (tx, _rx) = mpsc::channel(8);

        hub.on_join(id, tx).unwrap();
        assert!(hub.on_leave(id));
        assert!(!hub.on_leave(id));
        assert_eq!(hub.stats().leaves, 1);
    }
}
