//! Prometheus metrics endpoint.

use crate::error::{AppError, Result};
use crate::metrics::encode_metrics;

pub async fn prometheus_metrics() -> Result<String> {
    encode_metrics().map_err(|e| AppError::Internal(format!("Failed to encode metrics: {}", e)))
}
