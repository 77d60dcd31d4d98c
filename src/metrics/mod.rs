//! Metric descriptors, samples and Prometheus exposition.
//!
//! Collectors describe what they emit with descriptors; the orchestrator
//! renders the resulting samples alongside the exporter's own metrics.

mod descriptor;
mod exposition;
mod recorder;

pub use descriptor::{build_fq_name, MetricDescriptor, Sample, SampleError, ValueKind, NAMESPACE};
pub use exposition::{encode, render, ExpositionError};
pub use recorder::{Metrics, MetricsRecorder};
