//! Scrape orchestration.
//!
//! Every enabled collector runs in its own task, so a slow node only delays
//! its own samples and a panicking collector cannot take the scrape down.
//! Per-collector outcomes become `node_scrape_collector_*` samples and are
//! recorded in the exporter's self-metrics.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::future::join_all;
use tracing::{debug, error};

use crate::collector::{run_collector, Collector};
use crate::metrics::{MetricDescriptor, Metrics, MetricsRecorder, Sample, ValueKind, NAMESPACE};
use crate::utils::log_throttle::LogThrottle;

/// Repeated failures of the same collector are logged at most once per window.
pub const FAILURE_LOG_WINDOW: Duration = Duration::from_secs(60);

const SCRAPE_SUBSYSTEM: &str = "scrape";

/// How one collector fared in a scrape.
#[derive(Debug, Clone, PartialEq)]
pub struct CollectorOutcome {
    pub name: String,
    pub duration: Duration,
    /// `None` when the collector emitted a real reading.
    pub error: Option<String>,
}

impl CollectorOutcome {
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

/// Everything one scrape produced.
#[derive(Debug, Default)]
pub struct ScrapeReport {
    /// Collector samples followed by the per-collector scrape samples.
    pub samples: Vec<Sample>,
    /// One entry per collector, ordered by collector name.
    pub outcomes: Vec<CollectorOutcome>,
}

impl ScrapeReport {
    pub fn failures(&self) -> usize {
        self.outcomes.iter().filter(|o| !o.is_success()).count()
    }
}

pub struct Scraper<R: MetricsRecorder = Metrics> {
    collectors: BTreeMap<String, Arc<dyn Collector>>,
    recorder: R,
    collector_duration: Arc<MetricDescriptor>,
    collector_success: Arc<MetricDescriptor>,
    failure_log: LogThrottle,
}

impl<R: MetricsRecorder> Scraper<R> {
    pub fn new(collectors: BTreeMap<String, Arc<dyn Collector>>, recorder: R) -> Self {
        Self {
            collectors,
            recorder,
            collector_duration: MetricDescriptor::new(
                NAMESPACE,
                SCRAPE_SUBSYSTEM,
                "collector_duration_seconds",
                "chain_exporter: Duration of a collector scrape.",
                &["collector"],
                ValueKind::Gauge,
            ),
            collector_success: MetricDescriptor::new(
                NAMESPACE,
                SCRAPE_SUBSYSTEM,
                "collector_success",
                "chain_exporter: Whether a collector succeeded.",
                &["collector"],
                ValueKind::Gauge,
            ),
            failure_log: LogThrottle::new(FAILURE_LOG_WINDOW),
        }
    }

    pub fn collector_names(&self) -> impl Iterator<Item = &str> {
        self.collectors.keys().map(String::as_str)
    }

    /// Runs every collector once.
    pub async fn scrape(&self) -> ScrapeReport {
        let started = Instant::now();

        let handles = self.collectors.values().map(|collector| {
            let collector = Arc::clone(collector);
            tokio::spawn(async move {
                let started = Instant::now();
                let (samples, result) = run_collector(collector.as_ref()).await;
                (samples, result.map_err(|e| e.to_string()), started.elapsed())
            })
        });
        let results = join_all(handles).await;

        let mut report = ScrapeReport::default();
        let mut scrape_samples = Vec::with_capacity(self.collectors.len() * 2);
        for (name, joined) in self.collectors.keys().zip(results) {
            let (samples, result, duration) = match joined {
                Ok(run) => run,
                Err(e) => (
                    Vec::new(),
                    Err(format!("collector task aborted: {}", e)),
                    started.elapsed(),
                ),
            };
            report.samples.extend(samples);

            let duration_secs = duration.as_secs_f64();
            match &result {
                Ok(()) => {
                    debug!(collector = %name, duration_secs, "collector succeeded");
                    self.failure_log.reset(name);
                    self.recorder
                        .record_collector_run(name, "success", duration_secs);
                }
                Err(e) => {
                    if let Some(suppressed_count) = self.failure_log.should_emit(name) {
                        error!(
                            collector = %name,
                            duration_secs,
                            error = %e,
                            suppressed_count,
                            "collector failed"
                        );
                    }
                    self.recorder
                        .record_collector_run(name, "failure", duration_secs);
                }
            }

            let success = if result.is_ok() { 1.0 } else { 0.0 };
            scrape_samples.push(
                self.collector_duration
                    .must_new_sample(duration_secs, &[name.as_str()]),
            );
            scrape_samples.push(
                self.collector_success
                    .must_new_sample(success, &[name.as_str()]),
            );
            report.outcomes.push(CollectorOutcome {
                name: name.clone(),
                duration,
                error: result.err(),
            });
        }
        report.samples.extend(scrape_samples);

        self.recorder.record_scrape(started.elapsed().as_secs_f64());
        report
    }
}
