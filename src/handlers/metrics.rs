//! Metrics endpoint handler for Prometheus scraping.
//!
//! Every request gathers the registry, which triggers exactly one pull of the
//! kubelet stats summary. Gathering blocks on the kubelet request, so it runs
//! on the blocking pool.

use axum::{extract::State, http::StatusCode, response::IntoResponse};
use prometheus::{Encoder, TextEncoder};
use std::time::Instant;
use tracing::{debug, error, instrument};

use crate::state::SharedState;

/// Buffer capacity for metrics encoding.
const BUFFER_CAP: usize = 64 * 1024;

/// Error type for metrics endpoint failures.
#[derive(Debug)]
pub enum MetricsError {
    GatherFailed,
    EncodingFailed,
}

impl IntoResponse for MetricsError {
    fn into_response(self) -> axum::response::Response {
        let message = match self {
            MetricsError::GatherFailed => "Failed to gather metrics",
            MetricsError::EncodingFailed => "Failed to encode metrics",
        };
        (StatusCode::INTERNAL_SERVER_ERROR, message).into_response()
    }
}

/// Handler for the /metrics endpoint.
#[instrument(skip(state))]
pub async fn metrics_handler(State(state): State<SharedState>) -> Result<String, MetricsError> {
    let start = Instant::now();
    debug!("Processing /metrics request");

    let gather_state = state.clone();
    let families = tokio::task::spawn_blocking(move || gather_state.registry.gather())
        .await
        .map_err(|e| {
            error!("Metrics gathering task failed: {}", e);
            MetricsError::GatherFailed
        })?;

    let mut buffer = Vec::with_capacity(BUFFER_CAP);
    let encoder = TextEncoder::new();

    if encoder.encode(&families, &mut buffer).is_err() {
        error!("Failed to encode Prometheus metrics");
        return Err(MetricsError::EncodingFailed);
    }

    state.scrape_duration.set(start.elapsed().as_secs_f64());

    let time_series_count: usize = families.iter().map(|f| f.get_metric().len()).sum();
    debug!(
        "Metrics request completed: {} families, {} series, {} bytes, {:.3}ms",
        families.len(),
        time_series_count,
        buffer.len(),
        start.elapsed().as_secs_f64() * 1000.0
    );

    String::from_utf8(buffer).map_err(|_| MetricsError::EncodingFailed)
}
