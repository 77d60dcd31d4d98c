//! Exporter self-metrics recorded across scrapes.

use prometheus::{
    register_counter_vec_with_registry, register_histogram_vec_with_registry, CounterVec,
    HistogramVec, Opts, Registry,
};
use std::sync::Arc;

use super::exposition::{encode, ExpositionError};

/// Trait for recording scrape-level metrics.
pub trait MetricsRecorder: Clone + Send + Sync + 'static {
    /// Records one completed scrape and how long it took.
    fn record_scrape(&self, duration_secs: f64);

    /// Records the outcome of a single collector run within a scrape.
    fn record_collector_run(&self, collector: &str, result: &str, duration_secs: f64);
}

/// Prometheus-backed recorder. Unlike collector samples, these series
/// accumulate for the lifetime of the process.
#[derive(Clone)]
pub struct Metrics {
    registry: Arc<Registry>,
    scrapes_total: CounterVec,
    scrape_duration_seconds: HistogramVec,
    collector_runs_total: CounterVec,
    collector_duration_seconds: HistogramVec,
}

impl Metrics {
    pub fn new() -> Self {
        let registry = Arc::new(Registry::new());

        let scrapes_total = register_counter_vec_with_registry!(
            Opts::new("exporter_scrapes_total", "Total number of scrapes served"),
            &[],
            registry.clone()
        )
        .expect("Failed to register exporter_scrapes_total");

        let scrape_duration_seconds = register_histogram_vec_with_registry!(
            "exporter_scrape_duration_seconds",
            "Duration of a full scrape across all collectors in seconds",
            &[],
            vec![0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0],
            registry.clone()
        )
        .expect("Failed to register exporter_scrape_duration_seconds");

        let collector_runs_total = register_counter_vec_with_registry!(
            Opts::new(
                "exporter_collector_runs_total",
                "Total collector runs by outcome"
            ),
            &["collector", "result"],
            registry.clone()
        )
        .expect("Failed to register exporter_collector_runs_total");

        let collector_duration_seconds = register_histogram_vec_with_registry!(
            "exporter_collector_duration_seconds",
            "Duration of a single collector run in seconds",
            &["collector"],
            vec![0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0],
            registry.clone()
        )
        .expect("Failed to register exporter_collector_duration_seconds");

        Metrics {
            registry,
            scrapes_total,
            scrape_duration_seconds,
            collector_runs_total,
            collector_duration_seconds,
        }
    }

    /// Renders the self-metrics in Prometheus text format.
    pub fn render(&self) -> Result<String, ExpositionError> {
        encode(&self.registry)
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

impl MetricsRecorder for Metrics {
    fn record_scrape(&self, duration_secs: f64) {
        self.scrapes_total.with_label_values(&[]).inc();
        self.scrape_duration_seconds
            .with_label_values(&[])
            .observe(duration_secs);
    }

    fn record_collector_run(&self, collector: &str, result: &str, duration_secs: f64) {
        self.collector_runs_total
            .with_label_values(&[collector, result])
            .inc();
        self.collector_duration_seconds
            .with_label_values(&[collector])
            .observe(duration_secs);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recorded_runs_show_up_in_render() {
        let metrics = Metrics::new();
        metrics.record_collector_run("neo", "failure", 0.2);
        metrics.record_collector_run("neo", "failure", 0.1);
        metrics.record_collector_run("ontology", "success", 0.05);
        metrics.record_scrape(0.3);

        let text = metrics.render().expect("render should succeed");

        assert!(text.contains("exporter_scrapes_total 1"));
        assert!(text.contains("exporter_collector_runs_total{collector=\"neo\",result=\"failure\"} 2"));
        assert!(
            text.contains("exporter_collector_runs_total{collector=\"ontology\",result=\"success\"} 1")
        );
        assert!(text.contains("exporter_collector_duration_seconds_count{collector=\"neo\"} 2"));
    }
}
