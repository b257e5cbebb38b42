//! Root endpoint handler for the landing page.

use axum::{
    extract::State,
    response::{Html, IntoResponse},
};
use tracing::{debug, instrument};

use crate::handlers::health::FOOTER_TEXT;
use crate::state::SharedState;

/// Handler for the root `/` endpoint.
#[instrument(skip(state))]
pub async fn root_handler(State(state): State<SharedState>) -> impl IntoResponse {
    debug!("Processing / request");

    let version = env!("CARGO_PKG_VERSION");
    let target = state.exporter.source().url();

    let uptime_secs = state.start_time.elapsed().as_secs();
    let hours = uptime_secs / 3600;
    let minutes = (uptime_secs % 3600) / 60;
    let seconds = uptime_secs % 60;
    let uptime_str = format!("{}h {}m {}s", hours, minutes, seconds);

    let html = format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <title>Kubelet Summary Exporter</title>
    <style>
        body {{ font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, sans-serif; margin: 40px; line-height: 1.6; }}
        .info-label {{ font-weight: 600; color: #555; }}
        .footer {{ margin-top: 40px; color: #666; font-size: 0.9em; }}
    </style>
</head>
<body>
    <h1>Kubelet Summary Exporter</h1>
    <p>
        <span class="info-label">Version</span> {version}<br>
        <span class="info-label">Uptime</span> {uptime}<br>
        <span class="info-label">Target</span> <code>{target}</code>
    </p>
    <ul>
        <li><a href="/metrics">/metrics</a> - Prometheus metrics, one kubelet pull per request</li>
        <li><a href="/health">/health</a> - Outcome of the most recent pull (text)</li>
    </ul>
    <div class="footer">{footer}</div>
</body>
</html>"#,
        version = version,
        uptime = uptime_str,
        target = target,
        footer = FOOTER_TEXT,
    );

    Html(html)
}
