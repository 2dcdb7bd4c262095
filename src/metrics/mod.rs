//! Prometheus metrics for the relay service.
//!
//! Connection gauges and counters, relay delivery counters, and heartbeat
//! timing for monitoring the hub.

use lazy_static::lazy_static;
use prometheus::{
    register_histogram, register_int_counter, register_int_gauge, Encoder, Histogram, IntCounter,
    IntGauge, TextEncoder,
};

/// Prefix for all metrics
const METRIC_PREFIX: &str = "relay";

lazy_static! {
    // ============================================================================
    // Connection Metrics
    // ============================================================================

    /// Total number of active WebSocket connections
    pub static ref CONNECTIONS_TOTAL: IntGauge = register_int_gauge!(
        format!("{}_connections_total", METRIC_PREFIX),
        "Total number of active WebSocket connections"
    ).unwrap();

    /// Connections opened since startup
    pub static ref WS_CONNECTIONS_OPENED: IntCounter = register_int_counter!(
        format!("{}_connections_opened_total", METRIC_PREFIX),
        "Total WebSocket connections opened"
    ).unwrap();

    /// Connections closed since startup
    pub static ref WS_CONNECTIONS_CLOSED: IntCounter = register_int_counter!(
        format!("{}_connections_closed_total", METRIC_PREFIX),
        "Total WebSocket connections closed"
    ).unwrap();

    /// Connection lifetime distribution
    pub static ref WS_CONNECTION_DURATION: Histogram = register_histogram!(
        format!("{}_connection_duration_seconds", METRIC_PREFIX),
        "WebSocket connection duration in seconds",
        vec![1.0, 10.0, 60.0, 300.0, 1800.0, 3600.0, 14400.0]
    ).unwrap();

    // ============================================================================
    // Relay Metrics
    // ============================================================================

    /// Messages accepted and fanned out
    pub static ref MESSAGES_RELAYED_TOTAL: IntCounter = register_int_counter!(
        format!("{}_messages_relayed_total", METRIC_PREFIX),
        "Total messages relayed to all members"
    ).unwrap();

    /// Per-member deliveries
    pub static ref DELIVERIES_TOTAL: IntCounter = register_int_counter!(
        format!("{}_deliveries_total", METRIC_PREFIX),
        "Total per-member message deliveries"
    ).unwrap();

    /// Per-member delivery failures
    pub static ref DELIVERY_FAILURES_TOTAL: IntCounter = register_int_counter!(
        format!("{}_delivery_failures_total", METRIC_PREFIX),
        "Total per-member delivery failures"
    ).unwrap();

    /// Messages dropped because the sender was not joined
    pub static ref UNKNOWN_SENDER_DROPS_TOTAL: IntCounter = register_int_counter!(
        format!("{}_unknown_sender_drops_total", METRIC_PREFIX),
        "Total messages dropped from senders that are not joined"
    ).unwrap();

    /// Joins refused by the duplicate guard
    pub static ref DUPLICATE_JOINS_TOTAL: IntCounter = register_int_counter!(
        format!("{}_duplicate_joins_total", METRIC_PREFIX),
        "Total joins refused because the id was already live"
    ).unwrap();

    // ============================================================================
    // Heartbeat Metrics
    // ============================================================================

    /// Heartbeat round duration
    pub static ref HEARTBEAT_DURATION: Histogram = register_histogram!(
        format!("{}_heartbeat_duration_seconds", METRIC_PREFIX),
        "Duration of one heartbeat round in seconds",
        vec![0.001, 0.01, 0.1, 0.5, 1.0, 5.0]
    ).unwrap();
}

/// Encode all registered metrics in the Prometheus text format
pub fn encode_metrics() -> Result<String, prometheus::Error> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer)?;
    String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
}

/// Relay counter helpers
pub struct RelayMetrics;

impl RelayMetrics {
    pub fn record_relayed() {
        MESSAGES_RELAYED_TOTAL.inc();
    }

    pub fn record_delivered(count: u64) {
        DELIVERIES_TOTAL.inc_by(count);
    }

    pub fn record_failed(count: u64) {
        DELIVERY_FAILURES_TOTAL.inc_by(count);
    }

    pub fn record_dropped() {
        UNKNOWN_SENDER_DROPS_TOTAL.inc();
    }

    pub fn record_duplicate_join() {
        DUPLICATE_JOINS_TOTAL.inc();
    }
}

/// Heartbeat timing helpers
pub struct HeartbeatMetrics;

impl HeartbeatMetrics {
    pub fn record_duration_secs(secs: f64) {
        HEARTBEAT_DURATION.observe(secs);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_metrics() {
        RelayMetrics::record_relayed();
        let encoded = encode_metrics().unwrap();
        assert!(encoded.contains("relay_messages_relayed_total"));
    }
}
