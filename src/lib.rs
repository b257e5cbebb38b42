//! Kubelet Stats Summary Exporter Library
//!
//! Pulls the kubelet `/stats/summary` document and re-exposes it as Prometheus
//! metrics. The pipeline is split into small pieces so it can be embedded in
//! other exporters or tested without a kubelet:
//!
//! - [`catalog`]: the fixed set of metric definitions and their label schemas
//! - [`summary`]: the stats summary document model
//! - [`fetcher`]: the authenticated HTTPS client for the kubelet
//! - [`mapper`]: walks a decoded summary and produces observations
//! - [`exporter`]: a `prometheus::core::Collector` tying the above together
//!
//! # Usage
//!
//! ```rust,no_run
//! use kubelet_summary_exporter::{Fetcher, SummaryExporter};
//! use prometheus::{Encoder, Registry, TextEncoder};
//! use std::time::Duration;
//!
//! let fetcher = Fetcher::for_node(
//!     "10.0.0.5",
//!     10250,
//!     "/var/run/secrets/kubernetes.io/serviceaccount/token",
//!     Duration::from_secs(10),
//! )
//! .expect("client");
//!
//! let registry = Registry::new();
//! registry
//!     .register(Box::new(SummaryExporter::new(fetcher).expect("catalog")))
//!     .expect("register");
//!
//! let mut buffer = Vec::new();
//! TextEncoder::new()
//!     .encode(&registry.gather(), &mut buffer)
//!     .expect("encode");
//! println!("{}", String::from_utf8_lossy(&buffer));
//! ```

pub mod catalog;
pub mod exporter;
pub mod fetcher;
pub mod mapper;
pub mod summary;

// Re-export main types for convenience
pub use catalog::{Catalog, MetricDef, MetricKind};
pub use exporter::{PullOutcome, PullStatus, SummaryExporter};
pub use fetcher::{FailureClass, FetchError, Fetcher, SummarySource};
pub use mapper::{map_summary, Observation};
pub use summary::Summary;
