//! Renders one scrape's samples in the Prometheus text format.
//!
//! Samples are loaded into a throwaway `prometheus::Registry` per scrape, so
//! nothing observed in one scrape leaks into the next.

use std::collections::hash_map::Entry;
use std::collections::HashMap;

use prometheus::{CounterVec, Encoder, GaugeVec, Opts, Registry, TextEncoder};
use thiserror::Error;
use tracing::warn;

use super::descriptor::{Sample, ValueKind};

#[derive(Debug, Error)]
pub enum ExpositionError {
    #[error("failed to encode metrics: {0}")]
    Prometheus(#[from] prometheus::Error),
    #[error("metrics encoding produced invalid UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
}

enum Family {
    Counter(CounterVec),
    Gauge(GaugeVec),
}

/// Encodes `samples` into exposition text.
///
/// Two samples with the same descriptor and label values collapse into one
/// series; the later value wins for gauges and adds up for counters.
pub fn render(samples: &[Sample]) -> Result<String, ExpositionError> {
    let registry = Registry::new();
    let mut families: HashMap<&str, Family> = HashMap::new();

    for sample in samples {
        let desc = sample.descriptor();
        let family = match families.entry(desc.fq_name()) {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => {
                let opts = Opts::new(desc.fq_name(), desc.help());
                let label_names: Vec<&str> =
                    desc.label_names().iter().map(String::as_str).collect();
                let family = match desc.kind() {
                    ValueKind::Counter => {
                        let vec = CounterVec::new(opts, &label_names)?;
                        registry.register(Box::new(vec.clone()))?;
                        Family::Counter(vec)
                    }
                    ValueKind::Gauge => {
                        let vec = GaugeVec::new(opts, &label_names)?;
                        registry.register(Box::new(vec.clone()))?;
                        Family::Gauge(vec)
                    }
                };
                entry.insert(family)
            }
        };

        let label_values: Vec<&str> = sample.label_values().iter().map(String::as_str).collect();
        match family {
            Family::Counter(vec) => {
                if sample.value() < 0.0 {
                    warn!(
                        metric = desc.fq_name(),
                        value = sample.value(),
                        "dropping negative counter sample"
                    );
                    continue;
                }
                vec.get_metric_with_label_values(&label_values)?
                    .inc_by(sample.value());
            }
            Family::Gauge(vec) => {
                vec.get_metric_with_label_values(&label_values)?
                    .set(sample.value());
            }
        }
    }

    encode(&registry)
}

/// Encodes everything gathered from `registry`.
pub fn encode(registry: &Registry) -> Result<String, ExpositionError> {
    let encoder = TextEncoder::new();
    let metric_families = registry.gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer)?;
    Ok(String::from_utf8(buffer)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::descriptor::{MetricDescriptor, NAMESPACE};

    #[test]
    fn test_render_gauge_with_and_without_labels() {
        let height = MetricDescriptor::new(
            NAMESPACE,
            "neo",
            "height",
            "neo node block height",
            &[],
            ValueKind::Gauge,
        );
        let versioned = MetricDescriptor::new(
            NAMESPACE,
            "testnet",
            "height",
            "ontology testnet blockchain consensus node height",
            &["version"],
            ValueKind::Gauge,
        );
        let samples = vec![
            height.must_new_sample(12345.0, &[]),
            versioned.must_new_sample(777.0, &["v1.2.0"]),
        ];

        let text = render(&samples).expect("render should succeed");

        assert!(text.contains("# HELP node_neo_height neo node block height"));
        assert!(text.contains("# TYPE node_neo_height gauge"));
        assert!(text.contains("node_neo_height 12345"));
        assert!(text.contains("# TYPE node_testnet_height gauge"));
        assert!(text.contains("node_testnet_height{version=\"v1.2.0\"} 777"));
    }

    #[test]
    fn test_render_counter_and_drops_negative_values() {
        let failures = MetricDescriptor::new(
            NAMESPACE,
            "scrape",
            "failures_total",
            "failed probes",
            &["collector"],
            ValueKind::Counter,
        );
        let samples = vec![
            failures.must_new_sample(2.0, &["neo"]),
            failures.must_new_sample(-1.0, &["ontology"]),
        ];

        let text = render(&samples).expect("render should succeed");

        assert!(text.contains("# TYPE node_scrape_failures_total counter"));
        assert!(text.contains("node_scrape_failures_total{collector=\"neo\"} 2"));
        assert!(!text.contains("collector=\"ontology\""));
    }

    #[test]
    fn test_render_empty_scrape() {
        let text = render(&[]).expect("render should succeed");
        assert!(text.is_empty());
    }
}
