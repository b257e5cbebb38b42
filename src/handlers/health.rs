//! Health check endpoint handler.
//!
//! This module provides the `/health` endpoint handler that reports the
//! outcome of the most recent kubelet pull.

use axum::{extract::State, http::StatusCode, response::IntoResponse};
use kubelet_summary_exporter::PullOutcome;
use tracing::{debug, instrument};

use crate::state::SharedState;

// Time conversion constants
const SECONDS_PER_HOUR: f64 = 3600.0;
const MINUTES_PER_HOUR: f64 = 60.0;
const HOURS_PER_DAY: f64 = 24.0;

/// Footer text for human-readable HTTP endpoints.
pub const FOOTER_TEXT: &str = concat!("kubelet-summary-exporter ", env!("CARGO_PKG_VERSION"));

/// Handler for the /health endpoint.
#[instrument(skip(state))]
pub async fn health_handler(State(state): State<SharedState>) -> impl IntoResponse {
    debug!("Processing /health request");

    let last_pull = state.exporter.last_pull();

    // Healthy until a pull has failed; recovers on the next successful pull
    let status = match &last_pull {
        Some(pull) if !pull.outcome.is_success() => StatusCode::SERVICE_UNAVAILABLE,
        _ => StatusCode::OK,
    };

    let message = match &last_pull {
        None => "OK - No scrape yet".to_string(),
        Some(pull) => match &pull.outcome {
            PullOutcome::Collected { .. } => "OK".to_string(),
            PullOutcome::Failed(class) => format!("Last scrape failed: {}", class),
            PullOutcome::NotAttempted => "Last scrape failed: request could not be built".to_string(),
        },
    };

    let last_section = match &last_pull {
        None => "Last scrape: never".to_string(),
        Some(pull) => {
            let detail = match &pull.outcome {
                PullOutcome::Collected { observations } => format!("{} observations", observations),
                PullOutcome::Failed(class) => class.to_string(),
                PullOutcome::NotAttempted => "not attempted".to_string(),
            };
            format!(
                "Last scrape: {:.1}s ago, took {:.3}s ({})",
                pull.finished_at.elapsed().as_secs_f64(),
                pull.duration.as_secs_f64(),
                detail
            )
        }
    };

    let uptime_str = format_uptime(state.start_time.elapsed().as_secs());
    let target = state.exporter.source().url();
    let timeout = state.config.timeout().as_secs();
    let errors = state.exporter.error_total();

    debug!("Health check: {} - {}", status, message);
    (
        status,
        [("Content-Type", "text/plain; charset=utf-8")],
        format!(
            "{message}\n\nTarget: {target} (timeout {timeout}s)\nUptime: {uptime_str}\n{last_section}\nScrape errors: {errors}\n\n{FOOTER_TEXT}\n"
        ),
    )
}

fn format_uptime(uptime_seconds: u64) -> String {
    let uptime_hours = uptime_seconds as f64 / SECONDS_PER_HOUR;
    if uptime_hours < 1.0 {
        format!("{:.1} minutes", uptime_hours * MINUTES_PER_HOUR)
    } else if uptime_hours < HOURS_PER_DAY {
        format!("{:.1} hours", uptime_hours)
    } else {
        format!("{:.1} days", uptime_hours / HOURS_PER_DAY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_uptime() {
        assert_eq!(format_uptime(90), "1.5 minutes");
        assert_eq!(format_uptime(7200), "2.0 hours");
        assert_eq!(format_uptime(172800), "2.0 days");
    }
}
