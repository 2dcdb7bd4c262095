use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::registry::ConnectionId;

/// Messages sent from client to server
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum ClientMessage {
    Send { message: serde_json::Value },
    Leave,
    Ping,
}

/// Messages sent from server to client
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ServerMessage {
    #[serde(rename = "message")]
    Message {
        from: ConnectionId,
        payload: serde_json::Value,
    },
    #[serde(rename = "pong")]
    Pong,
    #[serde(rename = "heartbeat")]
    Heartbeat,
    #[serde(rename = "shutdown")]
    Shutdown {
        reason: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        reconnect_after_seconds: Option<u64>,
    },
    #[serde(rename = "error")]
    Error { code: String, message: String },
}

impl ServerMessage {
    pub fn relayed(from: ConnectionId, payload: serde_json::Value) -> Self {
        Self::Message { from, payload }
    }

    pub fn error(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Error {
            code: code.into(),
            message: message.into(),
        }
    }

    pub fn shutdown(reason: impl Into<String>, reconnect_after_seconds: Option<u64>) -> Self {
        Self::Shutdown {
            reason: reason.into(),
            reconnect_after_seconds,
        }
    }
}

/// Outbound frame queued for a connection's writer task.
///
/// Broadcasts to many members share one serialized frame instead of paying
/// the serialization cost per connection.
#[derive(Debug, Clone)]
pub enum OutboundMessage {
    Raw(ServerMessage),
    Serialized(Arc<str>),
}

impl OutboundMessage {
    pub fn preserialized(message: &ServerMessage) -> serde_json::Result<Self> {
        Ok(Self::Serialized(serde_json::to_string(message)?.into()))
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        match self {
            Self::Raw(message) => serde_json::to_string(message),
            Self::Serialized(json) => Ok(json.to_string()),
        }
    }
}
