use std::time::Duration;

use reqwest::{Client, Url};
use serde::de::DeserializeOwned;
use tokio::time::timeout;
use tracing::debug;

use super::envelope::{RpcEnvelope, RpcRequest};
use super::RpcError;

/// Deadline applied to a whole RPC exchange unless configured otherwise.
pub const DEFAULT_RPC_TIMEOUT: Duration = Duration::from_secs(3);

/// Issues JSON-RPC calls against one configured endpoint.
#[derive(Debug, Clone)]
pub struct RpcClient {
    http: Client,
    endpoint: Url,
    timeout: Duration,
}

impl RpcClient {
    /// Validates `endpoint` and prepares a client bound to `timeout`.
    pub fn new(endpoint: &str, timeout: Duration) -> Result<Self, RpcError> {
        let invalid = |reason: String| RpcError::InvalidEndpoint {
            endpoint: endpoint.to_string(),
            reason,
        };
        let url = Url::parse(endpoint).map_err(|e| invalid(e.to_string()))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(invalid(format!("unsupported scheme '{}'", url.scheme())));
        }
        let http = Client::builder().build().map_err(RpcError::Request)?;

        Ok(Self {
            http,
            endpoint: url,
            timeout,
        })
    }

    pub fn endpoint(&self) -> &str {
        self.endpoint.as_str()
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Calls `method` and decodes the envelope's `result` as `T`.
    ///
    /// Connecting, sending and reading the full body all count against the
    /// deadline. When it elapses the in-flight request is dropped, which
    /// closes the connection.
    pub async fn call<T: DeserializeOwned>(&self, method: &str) -> Result<T, RpcError> {
        match timeout(self.timeout, self.exchange(method)).await {
            Ok(result) => result,
            Err(_) => Err(RpcError::Timeout(self.timeout)),
        }
    }

    async fn exchange<T: DeserializeOwned>(&self, method: &str) -> Result<T, RpcError> {
        let request = self
            .http
            .post(self.endpoint.clone())
            .json(&RpcRequest::new(method))
            .build()
            .map_err(RpcError::Request)?;

        debug!(endpoint = %self.endpoint, method, "sending rpc request");
        let response = self.http.execute(request).await.map_err(|e| {
            if e.is_timeout() {
                RpcError::Timeout(self.timeout)
            } else {
                RpcError::Transport(e)
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(RpcError::Status(status));
        }

        let body = response.bytes().await.map_err(RpcError::Body)?;
        let envelope: RpcEnvelope<T> = serde_json::from_slice(&body)?;
        envelope.into_result()
    }
}
