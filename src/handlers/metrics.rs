//! Metrics endpoint handler for Prometheus scraping.
//!
//! Scrapes only read the registry; refreshing values is the scheduler's job.

use axum::{extract::State, http::header, http::StatusCode, response::IntoResponse};
use prometheus::{Encoder, TextEncoder};
use std::time::Instant;
use tracing::{debug, error, instrument};

use crate::state::SharedState;

/// Error type for metrics endpoint failures.
#[derive(Debug)]
pub enum MetricsError {
    EncodingFailed,
}

impl IntoResponse for MetricsError {
    fn into_response(self) -> axum::response::Response {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            "Failed to encode metrics",
        )
            .into_response()
    }
}

/// Handler for the metrics endpoint.
#[instrument(skip(state))]
pub async fn metrics_handler(
    State(state): State<SharedState>,
) -> Result<impl IntoResponse, MetricsError> {
    let start = Instant::now();
    debug!("Processing /metrics request");

    state.health_stats.record_http_request();
    state.health_stats.record_metrics_endpoint_call();

    let body = state.registry.encode().map_err(|e| {
        error!("Failed to encode metrics: {}", e);
        MetricsError::EncodingFailed
    })?;

    // Exposed on the next scrape
    let elapsed = start.elapsed();
    if let Some(telemetry) = &state.telemetry {
        telemetry.observe_scrape(elapsed.as_secs_f64());
    }
    state
        .health_stats
        .record_request_duration(elapsed.as_secs_f64() * 1000.0);
    state
        .health_stats
        .record_exported_series(state.registry.series_count() as u64);

    debug!(
        "Served {} bytes of metrics in {:.2}ms",
        body.len(),
        elapsed.as_secs_f64() * 1000.0
    );

    Ok((
        [(header::CONTENT_TYPE, TextEncoder::new().format_type().to_string())],
        body,
    ))
}
