use std::sync::Arc;

use axum::{
    extract::{
        ws::{Message, WebSocket},
        State, WebSocketUpgrade,
    },
    response::Response,
};
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::metrics::{
    CONNECTIONS_TOTAL, WS_CONNECTIONS_CLOSED, WS_CONNECTIONS_OPENED, WS_CONNECTION_DURATION,
};
use crate::registry::ConnectionHandle;
use crate::server::AppState;

use super::message::{ClientMessage, OutboundMessage, ServerMessage};

const CHANNEL_BUFFER_SIZE: usize = 32;

/// WebSocket upgrade handler
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Handle an established WebSocket connection
#[tracing::instrument(
    name = "ws.connection",
    skip(socket, state),
    fields(otel.kind = "server")
)]
async fn handle_socket(socket: WebSocket, state: AppState) {
    // The transport assigns the connection its identity at accept time
    let connection_id = Uuid::new_v4();
    let connection_start = std::time::Instant::now();

    // Create channel for sending messages to this connection
    let (tx, mut rx) = mpsc::channel::<OutboundMessage>(CHANNEL_BUFFER_SIZE);

    let handle = match state.hub.on_join(connection_id, tx) {
        Ok(h) => h,
        Err(e) => {
            tracing::warn!(connection_id = %connection_id, error = %e, "Connection rejected");
            // Send error and close; the duplicate attempt gets no handlers
            let (mut ws_sender, _) = socket.split();
            let error_msg = ServerMessage::error("DUPLICATE_JOIN", e.to_string());
            if let Ok(json) = serde_json::to_string(&error_msg) {
                let _ = ws_sender.send(Message::Text(json.into())).await;
            }
            let _ = ws_sender.close().await;
            return;
        }
    };

    WS_CONNECTIONS_OPENED.inc();
    CONNECTIONS_TOTAL.set(state.registry.count() as i64);

    tracing::info!(connection_id = %connection_id, "WebSocket connection established");

    // Split socket into sender and receiver
    let (mut ws_sender, mut ws_receiver) = socket.split();

    // Task for writing queued messages to the WebSocket
    let send_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            let text = match msg.to_json() {
                Ok(t) => t,
                Err(e) => {
                    tracing::error!(error = %e, "Failed to serialize message");
                    continue;
                }
            };

            if ws_sender.send(Message::Text(text.into())).await.is_err() {
                break;
            }
        }
    });

    // Task for receiving messages from the WebSocket
    let state_clone = state.clone();
    let handle_clone = handle.clone();
    let recv_task = tokio::spawn(async move {
        while let Some(result) = ws_receiver.next().await {
            match result {
                Ok(msg) => {
                    if !process_message(msg, &state_clone, &handle_clone).await {
                        break;
                    }
                }
                Err(e) => {
                    tracing::warn!(error = %e, "WebSocket receive error");
                    break;
                }
            }
        }
    });

    // Wait for either task to complete
    tokio::select! {
        _ = send_task => {
            tracing::debug!(connection_id = %connection_id, "Send task completed");
        }
        _ = recv_task => {
            tracing::debug!(connection_id = %connection_id, "Receive task completed");
        }
    }

    // Single leave point: explicit leave, close frame, and transport errors
    // all settle the tasks above, so the hub sees at most one leave per
    // connection.
    state.hub.on_leave(connection_id);

    WS_CONNECTIONS_CLOSED.inc();
    CONNECTIONS_TOTAL.set(state.registry.count() as i64);
    let duration = connection_start.elapsed().as_secs_f64();
    WS_CONNECTION_DURATION.observe(duration);

    tracing::info!(
        connection_id = %connection_id,
        duration_secs = duration,
        "WebSocket connection closed"
    );
}

/// Process a received WebSocket message
/// Returns false if the connection should be closed
async fn process_message(msg: Message, state: &AppState, handle: &Arc<ConnectionHandle>) -> bool {
    match msg {
        Message::Text(text) => {
            handle.update_activity();

            let client_msg: ClientMessage = match serde_json::from_str(&text) {
                Ok(m) => m,
                Err(e) => {
                    tracing::warn!(error = %e, "Failed to parse client message");
                    let _ = handle
                        .send(ServerMessage::error("INVALID_MESSAGE", e.to_string()))
                        .await;
                    return true;
                }
            };

            handle_client_message(client_msg, state, handle)
        }
        Message::Binary(_) => {
            let _ = handle
                .send(ServerMessage::error(
                    "UNSUPPORTED_FORMAT",
                    "Binary messages are not supported",
                ))
                .await;
            true
        }
        Message::Ping(_) => {
            handle.update_activity();
            // Axum answers with a pong automatically, but we track activity
            true
        }
        Message::Pong(_) => {
            handle.update_activity();
            true
        }
        Message::Close(_) => {
            tracing::debug!(connection_id = %handle.id, "Received close frame");
            false
        }
    }
}

/// Handle a parsed client message
/// Returns false if the connection should be closed
fn handle_client_message(msg: ClientMessage, state: &AppState, handle: &Arc<ConnectionHandle>) -> bool {
    match msg {
        ClientMessage::Send { message } => {
            state.hub.on_message(handle.id, message);
            true
        }
        ClientMessage::Ping => {
            let _ = handle.try_send(OutboundMessage::Raw(ServerMessage::Pong));
            true
        }
        ClientMessage::Leave => {
            tracing::debug!(connection_id = %handle.id, "Client requested leave");
            false
        }
    }
}
