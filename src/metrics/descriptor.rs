//! Metric descriptors and the samples they build.
//!
//! A [`MetricDescriptor`] is created once per collector instance and shared
//! read-only with the scrape orchestrator. Building a [`Sample`] with the
//! wrong number of label values is a bug in the calling collector, never a
//! consequence of a remote node misbehaving.

use std::collections::HashSet;
use std::sync::Arc;

use thiserror::Error;

/// Namespace every exported metric lives under.
pub const NAMESPACE: &str = "node";

/// How a sample's value should be interpreted by the exposition layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    Counter,
    Gauge,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SampleError {
    #[error("metric '{metric}' expects {expected} label values, got {actual}")]
    Cardinality {
        metric: String,
        expected: usize,
        actual: usize,
    },
}

/// Joins the non-empty parts of a metric identity with underscores.
///
/// An empty `name` yields an empty string, mirroring the Prometheus client
/// libraries.
pub fn build_fq_name(namespace: &str, subsystem: &str, name: &str) -> String {
    if name.is_empty() {
        return String::new();
    }
    [namespace, subsystem, name]
        .iter()
        .filter(|part| !part.is_empty())
        .copied()
        .collect::<Vec<_>>()
        .join("_")
}

/// Immutable identity and shape of a metric.
#[derive(Debug, PartialEq)]
pub struct MetricDescriptor {
    fq_name: String,
    help: String,
    label_names: Vec<String>,
    kind: ValueKind,
}

impl MetricDescriptor {
    /// Creates a descriptor.
    ///
    /// # Panics
    ///
    /// Panics if the metric name, help text or any label name is invalid, or
    /// if a label name repeats. Descriptors are built at registration time,
    /// so this only fires on a programming error.
    pub fn new(
        namespace: &str,
        subsystem: &str,
        name: &str,
        help: &str,
        label_names: &[&str],
        kind: ValueKind,
    ) -> Arc<Self> {
        let fq_name = build_fq_name(namespace, subsystem, name);
        assert!(
            is_valid_metric_name(&fq_name),
            "invalid metric name '{}'",
            fq_name
        );
        assert!(!help.is_empty(), "metric '{}' has empty help text", fq_name);

        let mut seen = HashSet::new();
        for label in label_names {
            assert!(
                is_valid_label_name(label),
                "metric '{}' has invalid label name '{}'",
                fq_name,
                label
            );
            assert!(
                seen.insert(*label),
                "metric '{}' declares label '{}' twice",
                fq_name,
                label
            );
        }

        Arc::new(Self {
            fq_name,
            help: help.to_string(),
            label_names: label_names.iter().map(|l| l.to_string()).collect(),
            kind,
        })
    }

    pub fn fq_name(&self) -> &str {
        &self.fq_name
    }

    pub fn help(&self) -> &str {
        &self.help
    }

    pub fn label_names(&self) -> &[String] {
        &self.label_names
    }

    pub fn kind(&self) -> ValueKind {
        self.kind
    }

    /// Builds a sample, rejecting a label value count that does not match
    /// the declared label names.
    pub fn new_sample(
        self: &Arc<Self>,
        value: f64,
        label_values: &[&str],
    ) -> Result<Sample, SampleError> {
        if label_values.len() != self.label_names.len() {
            return Err(SampleError::Cardinality {
                metric: self.fq_name.clone(),
                expected: self.label_names.len(),
                actual: label_values.len(),
            });
        }
        Ok(Sample {
            descriptor: Arc::clone(self),
            value,
            label_values: label_values.iter().map(|v| v.to_string()).collect(),
        })
    }

    /// Like [`MetricDescriptor::new_sample`], but panics on a cardinality
    /// mismatch.
    pub fn must_new_sample(self: &Arc<Self>, value: f64, label_values: &[&str]) -> Sample {
        self.new_sample(value, label_values)
            .unwrap_or_else(|e| panic!("{}", e))
    }
}

/// One observation bound to a descriptor.
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    descriptor: Arc<MetricDescriptor>,
    value: f64,
    label_values: Vec<String>,
}

impl Sample {
    pub fn descriptor(&self) -> &Arc<MetricDescriptor> {
        &self.descriptor
    }

    pub fn value(&self) -> f64 {
        self.value
    }

    pub fn label_values(&self) -> &[String] {
        &self.label_values
    }
}

fn is_valid_metric_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' || c == ':' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == ':')
}

fn is_valid_label_name(name: &str) -> bool {
    if name.starts_with("__") {
        return false;
    }
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}
