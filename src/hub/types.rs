use serde::Serialize;

use crate::registry::ConnectionId;

/// Result of one relay attempt
#[derive(Debug, Clone, Serialize)]
pub struct DeliveryReport {
    /// Whether the message was accepted for fan-out (sender was joined)
    pub relayed: bool,
    /// Number of connections the message was queued for
    pub delivered_to: usize,
    /// Number of connections that could not accept the message
    pub failed: usize,
}

impl DeliveryReport {
    pub(crate) fn new(delivered: usize, failed: usize) -> Self {
        Self {
            relayed: true,
            delivered_to: delivered,
            failed,
        }
    }

    /// Report for a message dropped before fan-out (unknown sender)
    pub(crate) fn dropped() -> Self {
        Self {
            relayed: false,
            delivered_to: 0,
            failed: 0,
        }
    }
}

/// Error returned when a join is refused
#[derive(Debug, Clone)]
pub enum JoinError {
    /// The id is already live; the attempt performed no state change.
    Duplicate { id: ConnectionId },
}

impl std::fmt::Display for JoinError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Duplicate { id } => {
                write!(f, "Connection {} is already joined", id)
            }
        }
    }
}

impl std::error::Error for JoinError {}
