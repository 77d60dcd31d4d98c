use std::sync::Arc;

use serde::Deserialize;
use tracing::{debug, info, warn, Instrument, Span};

use super::{Collector, CollectorError, Emitter, FactoryContext, BAD_HEIGHT};
use crate::metrics::{MetricDescriptor, ValueKind, NAMESPACE};
use crate::rpc::{RpcClient, RpcError};

pub const NAME: &str = "neo";
/// Endpoint used when the operator does not configure one.
pub const DEFAULT_RPC: &str = "http://127.0.0.1:10332";

const SUBSYSTEM: &str = "neo";
const STATE_HEIGHT_METHOD: &str = "getstateheight";

/// Reports the state root height of a neo node.
pub struct NeoCollector {
    height: Arc<MetricDescriptor>,
    client: RpcClient,
    span: Span,
}

#[derive(Debug, Deserialize)]
struct StateHeight {
    localrootindex: Option<u64>,
    validatedrootindex: Option<u64>,
}

impl NeoCollector {
    pub fn new(ctx: &FactoryContext) -> Result<Self, CollectorError> {
        let endpoint = ctx.rpc_endpoint(DEFAULT_RPC);
        let client = RpcClient::new(endpoint, ctx.rpc_timeout).map_err(CollectorError::Config)?;
        info!(parent: &ctx.span, endpoint, "Creating neo collector");

        Ok(Self {
            height: MetricDescriptor::new(
                NAMESPACE,
                SUBSYSTEM,
                "height",
                "neo node block height",
                &[],
                ValueKind::Gauge,
            ),
            client,
            span: ctx.span.clone(),
        })
    }

    async fn fetch_height(&self) -> Result<u64, RpcError> {
        let state: StateHeight = self.client.call(STATE_HEIGHT_METHOD).await?;
        debug!(
            localrootindex = ?state.localrootindex,
            validatedrootindex = ?state.validatedrootindex,
            "neo state height"
        );
        match state.localrootindex {
            Some(height) if height > 0 => Ok(height),
            _ => Err(RpcError::EmptyField("localrootindex")),
        }
    }

    async fn collect(&self, emitter: &Emitter) -> Result<(), CollectorError> {
        match self.fetch_height().await {
            Ok(height) => {
                emitter.emit(self.height.must_new_sample(height as f64, &[]));
                Ok(())
            }
            Err(source) => {
                warn!(
                    endpoint = self.client.endpoint(),
                    error = %source,
                    "can not get valid response from neo rpc"
                );
                emitter.emit(self.height.must_new_sample(BAD_HEIGHT, &[]));
                Err(CollectorError::Rpc {
                    endpoint: self.client.endpoint().to_string(),
                    source,
                })
            }
        }
    }
}

#[async_trait::async_trait]
impl Collector for NeoCollector {
    async fn update(&self, emitter: &Emitter) -> Result<(), CollectorError> {
        self.collect(emitter).instrument(self.span.clone()).await
    }
}

pub fn new_collector(ctx: &FactoryContext) -> Result<Arc<dyn Collector>, CollectorError> {
    Ok(Arc::new(NeoCollector::new(ctx)?))
}
