//! Application state management for the exporter.
//!
//! This module defines the shared application state that is passed
//! to HTTP handlers.

use kubelet_summary_exporter::{Fetcher, SummaryExporter};
use prometheus::core::{Collector, Desc};
use prometheus::proto::MetricFamily;
use prometheus::{Gauge, Registry};
use std::sync::Arc;
use std::time::Instant;

use crate::config::Config;

/// Type alias for shared application state.
pub type SharedState = Arc<AppState>;

/// Global application state shared across requests.
pub struct AppState {
    pub registry: Registry,
    /// Registered with `registry`; kept here for `/health`.
    pub exporter: Arc<SummaryExporter<Fetcher>>,
    pub scrape_duration: Gauge,
    pub config: Arc<Config>,
    /// Server start time for uptime calculation.
    pub start_time: Instant,
}

/// Registry entry sharing the exporter with [`AppState`].
pub struct RegisteredExporter(pub Arc<SummaryExporter<Fetcher>>);

impl Collector for RegisteredExporter {
    fn desc(&self) -> Vec<&Desc> {
        self.0.desc()
    }

    fn collect(&self) -> Vec<MetricFamily> {
        self.0.collect()
    }
}
