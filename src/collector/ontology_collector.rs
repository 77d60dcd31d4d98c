use std::sync::Arc;

use tracing::{debug, info, warn, Instrument, Span};

use super::{Collector, CollectorError, Emitter, FactoryContext, BAD_HEIGHT, BAD_VERSION};
use crate::metrics::{MetricDescriptor, ValueKind, NAMESPACE};
use crate::rpc::{RpcClient, RpcError};

pub const NAME: &str = "ontology";
/// Endpoint used when the operator does not configure one.
pub const DEFAULT_RPC: &str = "http://127.0.0.1:40336";

const SUBSYSTEM: &str = "testnet";
const BLOCK_COUNT_METHOD: &str = "getblockcount";
const VERSION_METHOD: &str = "getversion";

/// Reports the block height of an ontology consensus node, labelled with the
/// node's version.
///
/// The version is only fetched once the height is known. If either call
/// fails the sentinel pair (height `0.0`, version `"0.0"`) is emitted, so the
/// series never carries a real height under a made-up version.
pub struct OntologyCollector {
    height: Arc<MetricDescriptor>,
    client: RpcClient,
    span: Span,
}

impl OntologyCollector {
    pub fn new(ctx: &FactoryContext) -> Result<Self, CollectorError> {
        let endpoint = ctx.rpc_endpoint(DEFAULT_RPC);
        let client = RpcClient::new(endpoint, ctx.rpc_timeout).map_err(CollectorError::Config)?;
        info!(parent: &ctx.span, endpoint, "Creating ontology collector");

        Ok(Self {
            height: MetricDescriptor::new(
                NAMESPACE,
                SUBSYSTEM,
                "height",
                "ontology testnet blockchain consensus node height",
                &["version"],
                ValueKind::Gauge,
            ),
            client,
            span: ctx.span.clone(),
        })
    }

    async fn fetch_height(&self) -> Result<u64, RpcError> {
        match self.client.call::<u64>(BLOCK_COUNT_METHOD).await? {
            0 => Err(RpcError::EmptyField("result")),
            height => Ok(height),
        }
    }

    async fn fetch_version(&self) -> Result<String, RpcError> {
        let version: String = self.client.call(VERSION_METHOD).await?;
        if version.trim().is_empty() {
            return Err(RpcError::EmptyField("result"));
        }
        Ok(version)
    }

    fn emit_sentinel(&self, emitter: &Emitter) {
        emitter.emit(self.height.must_new_sample(BAD_HEIGHT, &[BAD_VERSION]));
    }

    fn fail(&self, emitter: &Emitter, method: &str, source: RpcError) -> CollectorError {
        warn!(
            endpoint = self.client.endpoint(),
            method,
            error = %source,
            "can not get valid response from ontology rpc"
        );
        self.emit_sentinel(emitter);
        CollectorError::Rpc {
            endpoint: self.client.endpoint().to_string(),
            source,
        }
    }

    async fn collect(&self, emitter: &Emitter) -> Result<(), CollectorError> {
        let height = match self.fetch_height().await {
            Ok(height) => height,
            Err(e) => return Err(self.fail(emitter, BLOCK_COUNT_METHOD, e)),
        };

        let version = match self.fetch_version().await {
            Ok(version) => version,
            Err(e) => return Err(self.fail(emitter, VERSION_METHOD, e)),
        };

        debug!(
            endpoint = self.client.endpoint(),
            height,
            version = %version,
            "ontology node collector"
        );

        match self.height.new_sample(height as f64, &[&version]) {
            Ok(sample) => {
                emitter.emit(sample);
                Ok(())
            }
            Err(e) => {
                self.emit_sentinel(emitter);
                Err(e.into())
            }
        }
    }
}

#[async_trait::async_trait]
impl Collector for OntologyCollector {
    async fn update(&self, emitter: &Emitter) -> Result<(), CollectorError> {
        self.collect(emitter).instrument(self.span.clone()).await
    }
}

pub fn new_collector(ctx: &FactoryContext) -> Result<Arc<dyn Collector>, CollectorError> {
    Ok(Arc::new(OntologyCollector::new(ctx)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collector::run_collector;
    use crate::collector::testing::{context, refused_endpoint, silent_endpoint};
    use crate::rpc::DEFAULT_RPC_TIMEOUT;
    use mockito::{Matcher, Server};
    use serde_json::json;
    use std::time::{Duration, Instant};

    async fn mock_method(
        server: &mut Server,
        method: &str,
        status: usize,
        body: &str,
    ) -> mockito::Mock {
        server
            .mock("POST", "/")
            .match_body(Matcher::PartialJson(json!({ "method": method })))
            .with_status(status)
            .with_header("content-type", "application/json")
            .with_body(body)
            .create_async()
            .await
    }

    fn collector_for(endpoint: &str) -> OntologyCollector {
        OntologyCollector::new(&context(NAME, endpoint, DEFAULT_RPC_TIMEOUT)).unwrap()
    }

    fn assert_sentinel(samples: &[crate::metrics::Sample]) {
        assert_eq!(samples.len(), 1);
        assert_eq!(samples[0].value(), 0.0);
        assert_eq!(samples[0].label_values(), &["0.0".to_string()]);
    }

    #[tokio::test]
    async fn test_emits_height_labelled_with_version() {
        let mut server = Server::new_async().await;
        let height = mock_method(&mut server, "getblockcount", 200, r#"{"result": 777}"#).await;
        let version = mock_method(&mut server, "getversion", 200, r#"{"result":"v1.2.0"}"#).await;

        let collector = collector_for(&server.url());
        let (samples, result) = run_collector(&collector).await;

        height.assert_async().await;
        version.assert_async().await;
        assert!(result.is_ok());
        assert_eq!(samples.len(), 1);
        assert_eq!(samples[0].value(), 777.0);
        assert_eq!(samples[0].label_values(), &["v1.2.0".to_string()]);
        assert_eq!(
            samples[0].label_values().len(),
            samples[0].descriptor().label_names().len()
        );
        assert_eq!(samples[0].descriptor().fq_name(), "node_testnet_height");
    }

    #[tokio::test]
    async fn test_http_500_emits_sentinel_pair() {
        let mut server = Server::new_async().await;
        let _height = mock_method(&mut server, "getblockcount", 500, "boom").await;

        let collector = collector_for(&server.url());
        let (samples, result) = run_collector(&collector).await;

        assert_sentinel(&samples);
        assert!(matches!(
            result,
            Err(CollectorError::Rpc {
                source: RpcError::Status(_),
                ..
            })
        ));
    }

    #[tokio::test]
    async fn test_height_failure_skips_version_call() {
        let mut server = Server::new_async().await;
        let _height = mock_method(&mut server, "getblockcount", 200, "{").await;
        let version = server
            .mock("POST", "/")
            .match_body(Matcher::PartialJson(json!({ "method": "getversion" })))
            .expect(0)
            .create_async()
            .await;

        let collector = collector_for(&server.url());
        let (samples, result) = run_collector(&collector).await;

        version.assert_async().await;
        assert_sentinel(&samples);
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_version_failure_after_height_emits_full_sentinel() {
        let mut server = Server::new_async().await;
        let _height = mock_method(&mut server, "getblockcount", 200, r#"{"result": 777}"#).await;
        let _version = mock_method(&mut server, "getversion", 503, "unavailable").await;

        let collector = collector_for(&server.url());
        let (samples, result) = run_collector(&collector).await;

        assert_sentinel(&samples);
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_remote_error_code_emits_sentinel() {
        let mut server = Server::new_async().await;
        let _height = mock_method(
            &mut server,
            "getblockcount",
            200,
            r#"{"desc":"INTERNAL ERROR","error":10001,"id":"1","jsonrpc":"2.0","result":0}"#,
        )
        .await;

        let collector = collector_for(&server.url());
        let (samples, result) = run_collector(&collector).await;

        assert_sentinel(&samples);
        assert!(matches!(
            result,
            Err(CollectorError::Rpc {
                source: RpcError::Remote { code: 10001, .. },
                ..
            })
        ));
    }

    #[tokio::test]
    async fn test_empty_version_emits_sentinel() {
        let mut server = Server::new_async().await;
        let _height = mock_method(&mut server, "getblockcount", 200, r#"{"result": 10}"#).await;
        let _version = mock_method(&mut server, "getversion", 200, r#"{"result":""}"#).await;

        let collector = collector_for(&server.url());
        let (samples, result) = run_collector(&collector).await;

        assert_sentinel(&samples);
        assert!(matches!(
            result,
            Err(CollectorError::Rpc {
                source: RpcError::EmptyField("result"),
                ..
            })
        ));
    }

    #[tokio::test]
    async fn test_connection_refused_emits_sentinel_pair() {
        let collector = collector_for(&refused_endpoint());
        let (samples, result) = run_collector(&collector).await;

        assert_sentinel(&samples);
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_unresponsive_node_honours_configured_deadline() {
        let endpoint = silent_endpoint().await;
        let collector =
            OntologyCollector::new(&context(NAME, &endpoint, Duration::from_millis(300))).unwrap();

        let started = Instant::now();
        let (samples, result) = run_collector(&collector).await;

        assert!(started.elapsed() < Duration::from_secs(1));
        assert_sentinel(&samples);
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_repeated_updates_are_identical() {
        let mut server = Server::new_async().await;
        let _height = mock_method(&mut server, "getblockcount", 200, r#"{"result": 99}"#).await;
        let _version = mock_method(&mut server, "getversion", 200, r#"{"result":"v2.0.1"}"#).await;

        let collector = collector_for(&server.url());
        let (first, first_result) = run_collector(&collector).await;
        let (second, second_result) = run_collector(&collector).await;

        assert!(first_result.is_ok());
        assert!(second_result.is_ok());
        assert_eq!(first, second);
    }
}
