//! Describe/collect facade over the fetch → decode → map pipeline.
//!
//! [`SummaryExporter`] implements `prometheus::core::Collector`, so a
//! `Registry` drives it: `desc()` returns the fixed catalog and `collect()` runs
//! one pull against the kubelet. The scrape error counter is the only state that
//! survives between pulls; it is emitted on every collect that reached the
//! kubelet, with one series per failure class.

use prometheus::core::{Collector, Desc};
use prometheus::proto::MetricFamily;
use prometheus::{CounterVec, GaugeVec, Opts};
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};
use tracing::{debug, error, warn};

use crate::catalog::{Catalog, MetricDef, SCRAPE_ERRORS};
use crate::fetcher::{FailureClass, FetchError, SummarySource};
use crate::mapper::{map_summary, Observation};
use crate::summary::Summary;

/// Exit code used when the bearer token cannot be read.
pub const EXIT_TOKEN_UNREADABLE: i32 = 1;

/// How a single pull ended.
#[derive(Debug, Clone, PartialEq)]
pub enum PullOutcome {
    /// Summary fetched, decoded and mapped.
    Collected { observations: usize },
    /// Failed at fetch or decode; counted on the error counter.
    Failed(FailureClass),
    /// The request could not be constructed; nothing was emitted.
    NotAttempted,
}

impl PullOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, PullOutcome::Collected { .. })
    }
}

/// Outcome and timing of the most recent pull.
#[derive(Debug, Clone)]
pub struct PullStatus {
    pub outcome: PullOutcome,
    pub finished_at: Instant,
    pub duration: Duration,
}

/// Result of one pull: what happened and the observations produced.
#[derive(Debug)]
pub struct Pull {
    pub outcome: PullOutcome,
    pub observations: Vec<Observation>,
}

/// Prometheus collector that scrapes the kubelet stats summary on every collect.
pub struct SummaryExporter<S: SummarySource> {
    source: S,
    catalog: Catalog,
    errors: CounterVec,
    last_pull: Mutex<Option<PullStatus>>,
}

impl<S: SummarySource> SummaryExporter<S> {
    pub fn new(source: S) -> prometheus::Result<Self> {
        let catalog = Catalog::new()?;
        let errors = CounterVec::new(
            Opts::new(SCRAPE_ERRORS.name, SCRAPE_ERRORS.help),
            SCRAPE_ERRORS.labels,
        )?;
        // Every class is exported from the first collect on, at zero until it occurs.
        for class in FailureClass::ALL {
            errors.get_metric_with_label_values(&[class.as_label()])?;
        }

        Ok(Self {
            source,
            catalog,
            errors,
            last_pull: Mutex::new(None),
        })
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Status of the most recent pull, `None` before the first one.
    pub fn last_pull(&self) -> Option<PullStatus> {
        self.last_pull.lock().ok().and_then(|guard| guard.clone())
    }

    /// Cumulative error count across all failure classes.
    pub fn error_total(&self) -> f64 {
        self.errors
            .collect()
            .iter()
            .flat_map(|family| family.get_metric().iter())
            .map(|metric| metric.get_counter().value())
            .sum()
    }

    /// Runs one fetch → decode → map cycle.
    ///
    /// A token that cannot be read terminates the process: without an
    /// identity no later pull can succeed.
    pub fn pull(&self) -> Pull {
        let started = Instant::now();
        let pull = self.run_pull();
        self.record(&pull.outcome, started);
        pull
    }

    fn run_pull(&self) -> Pull {
        let body = match self.source.fetch() {
            Ok(body) => body,
            Err(e) => return self.fetch_failed(e),
        };

        let summary = match Summary::parse(&body) {
            Ok(summary) => summary,
            Err(e) => {
                error!("Failed to parse body: {}", e);
                return self.failed(FailureClass::ParseBody);
            }
        };

        let observations = map_summary(&summary);
        debug!(
            "Mapped {} observations for node {} ({} pods)",
            observations.len(),
            summary.node.node_name,
            summary.pods.len()
        );

        Pull {
            outcome: PullOutcome::Collected {
                observations: observations.len(),
            },
            observations,
        }
    }

    fn fetch_failed(&self, err: FetchError) -> Pull {
        if err.is_fatal() {
            error!("Unable to load specified token: {}", err);
            std::process::exit(EXIT_TOKEN_UNREADABLE);
        }

        match err.class() {
            Some(class) => {
                match class {
                    FailureClass::ReadBody => error!("Failed to read body: {}", err),
                    _ => warn!("Failed to scrape stats/summary: {}", err),
                }
                self.failed(class)
            }
            None => {
                error!("Failed to create request: {}", err);
                Pull {
                    outcome: PullOutcome::NotAttempted,
                    observations: Vec::new(),
                }
            }
        }
    }

    fn failed(&self, class: FailureClass) -> Pull {
        self.errors.with_label_values(&[class.as_label()]).inc();
        Pull {
            outcome: PullOutcome::Failed(class),
            observations: Vec::new(),
        }
    }

    fn record(&self, outcome: &PullOutcome, started: Instant) {
        if let Ok(mut guard) = self.last_pull.lock() {
            *guard = Some(PullStatus {
                outcome: outcome.clone(),
                finished_at: Instant::now(),
                duration: started.elapsed(),
            });
        }
    }
}

impl<S: SummarySource> Collector for SummaryExporter<S> {
    fn desc(&self) -> Vec<&Desc> {
        let mut descs = self.catalog.descs();
        descs.extend(self.errors.desc());
        descs
    }

    fn collect(&self) -> Vec<MetricFamily> {
        let pull = self.pull();
        if pull.outcome == PullOutcome::NotAttempted {
            return Vec::new();
        }

        let mut families = self.errors.collect();
        families.extend(observations_to_families(&pull.observations));
        families
    }
}

/// Groups observations into one gauge family per metric, in first-seen order.
pub fn observations_to_families(observations: &[Observation]) -> Vec<MetricFamily> {
    let mut order: Vec<&'static MetricDef> = Vec::new();
    let mut vecs: HashMap<&'static str, GaugeVec> = HashMap::new();

    for observation in observations {
        let def = observation.metric;
        if !vecs.contains_key(def.name) {
            match GaugeVec::new(Opts::new(def.name, def.help), def.labels) {
                Ok(vec) => {
                    vecs.insert(def.name, vec);
                    order.push(def);
                }
                Err(e) => {
                    error!("Failed to create gauge {}: {}", def.name, e);
                    continue;
                }
            }
        }

        let Some(vec) = vecs.get(def.name) else {
            continue;
        };
        let labels: Vec<&str> = observation.labels.iter().map(String::as_str).collect();
        match vec.get_metric_with_label_values(labels.as_slice()) {
            Ok(gauge) => gauge.set(observation.value),
            Err(e) => warn!("Dropping observation for {}: {}", def.name, e),
        }
    }

    order
        .into_iter()
        .filter_map(|def| vecs.remove(def.name))
        .flat_map(|vec| vec.collect())
        .collect()
}
