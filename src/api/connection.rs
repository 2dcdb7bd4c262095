//! Connection listing endpoint.

use axum::{extract::State, Json};
use serde::Serialize;

use crate::registry::ConnectionId;
use crate::server::AppState;

#[derive(Debug, Serialize)]
pub struct ConnectionsResponse {
    pub count: usize,
    pub members: Vec<ConnectionId>,
}

pub async fn list_connections(State(state): State<AppState>) -> Json<ConnectionsResponse> {
    Json(ConnectionsResponse {
        count: state.registry.count(),
        members: state.registry.member_ids(),
    })
}
