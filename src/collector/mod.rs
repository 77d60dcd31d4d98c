//! Collector contract.
//!
//! A collector probes one remote node per scrape and pushes samples through
//! an [`Emitter`]. When the probe fails it still emits a sentinel sample and
//! then returns the error, so alert rules can key off a zero-valued series
//! instead of a missing one.

pub mod neo_collector;
pub mod ontology_collector;
pub mod registry;

#[cfg(test)]
pub(crate) mod testing;

use thiserror::Error;
use tokio::sync::mpsc;
use tracing::debug;

use crate::metrics::{Sample, SampleError};
use crate::rpc::RpcError;

pub use registry::{default_registry, CollectorFactory, CollectorRegistry, FactoryContext, RegistryError};

/// Height reported when a node cannot be probed.
pub const BAD_HEIGHT: f64 = 0.0;
/// Version label reported when a node cannot be probed.
pub const BAD_VERSION: &str = "0.0";

#[derive(Debug, Error)]
pub enum CollectorError {
    #[error("rpc call to {endpoint} failed: {source}")]
    Rpc {
        endpoint: String,
        #[source]
        source: RpcError,
    },

    #[error("invalid collector configuration: {0}")]
    Config(#[source] RpcError),

    #[error(transparent)]
    Sample(#[from] SampleError),
}

/// Sending half of a scrape's sample channel.
#[derive(Debug, Clone)]
pub struct Emitter {
    tx: mpsc::UnboundedSender<Sample>,
}

impl Emitter {
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<Sample>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    pub fn emit(&self, sample: Sample) {
        if let Err(e) = self.tx.send(sample) {
            debug!(
                metric = e.0.descriptor().fq_name(),
                "sample receiver dropped, discarding sample"
            );
        }
    }
}

/// A unit that probes one remote service and emits samples once per scrape.
#[async_trait::async_trait]
pub trait Collector: Send + Sync {
    /// Runs one probe. Returning `Err` means a sentinel was emitted in place
    /// of the real reading.
    async fn update(&self, emitter: &Emitter) -> Result<(), CollectorError>;
}

/// Runs `collector` once and gathers everything it emitted, in order.
pub async fn run_collector(collector: &dyn Collector) -> (Vec<Sample>, Result<(), CollectorError>) {
    let (emitter, mut rx) = Emitter::channel();
    let result = collector.update(&emitter).await;
    drop(emitter);

    let mut samples = Vec::new();
    while let Ok(sample) = rx.try_recv() {
        samples.push(sample);
    }
    (samples, result)
}
