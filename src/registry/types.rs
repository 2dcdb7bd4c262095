//! Connection handle and related types

use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicI64, Ordering};
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::websocket::{OutboundMessage, ServerMessage};

/// Opaque identifier for one live connection, assigned by the transport.
pub type ConnectionId = Uuid;

/// Handle for a single WebSocket connection
pub struct ConnectionHandle {
    pub id: ConnectionId,
    pub sender: mpsc::Sender<OutboundMessage>,
    pub connected_at: DateTime<Utc>,
    /// Last activity timestamp (Unix seconds) - using AtomicI64 for lock-free updates
    last_activity: AtomicI64,
}

impl ConnectionHandle {
    pub fn new(id: ConnectionId, sender: mpsc::Sender<OutboundMessage>) -> Self {
        let now = Utc::now();
        Self {
            id,
            sender,
            connected_at: now,
            last_activity: AtomicI64::new(now.timestamp()),
        }
    }

    pub fn update_activity(&self) {
        self.last_activity
            .store(Utc::now().timestamp(), Ordering::Relaxed);
    }

    pub fn last_activity(&self) -> DateTime<Utc> {
        DateTime::from_timestamp(self.last_activity.load(Ordering::Relaxed), 0)
            .unwrap_or_else(Utc::now)
    }

    /// Send a ServerMessage (will be serialized when written to the socket)
    pub async fn send(
        &self,
        message: ServerMessage,
    ) -> Result<(), mpsc::error::SendError<OutboundMessage>> {
        self.sender.send(OutboundMessage::Raw(message)).await
    }

    /// Queue an outbound message without waiting. A full or closed queue is
    /// reported to the caller and must not stall delivery to other members.
    pub fn try_send(
        &self,
        message: OutboundMessage,
    ) -> Result<(), mpsc::error::TrySendError<OutboundMessage>> {
        self.sender.try_send(message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_try_send_reports_closed_queue() {
        let (tx, rx) = mpsc::channel(1);
        let handle = ConnectionHandle::new(Uuid::new_v4(), tx);
        drop(rx);

        let result = handle.try_send(OutboundMessage::Raw(ServerMessage::Heartbeat));
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_try_send_reports_full_queue() {
        let (tx, _rx) = mpsc::channel(1);
        let handle = ConnectionHandle::new(Uuid::new_v4(), tx);

        assert!(handle
            .try_send(OutboundMessage::Raw(ServerMessage::Heartbeat))
            .is_ok());
        assert!(handle
            .try_send(OutboundMessage::Raw(ServerMessage::Heartbeat))
            .is_err());
    }

    #[test]
    fn test_activity_tracking() {
        let (tx, _rx) = mpsc::channel(1);
        let handle = ConnectionHandle::new(Uuid::new_v4(), tx);
        let before = handle.last_activity();
        handle.update_activity();
        assert!(handle.last_activity() >= before);
    }
}
