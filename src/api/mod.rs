//! API layer - HTTP diagnostics endpoints.

mod connection;
mod health;
mod metrics;
mod routes;

pub use connection::list_connections;
pub use health::{health, stats};
pub use metrics::prometheus_metrics;
pub use routes::api_routes;
