//! Minimal JSON-RPC 2.0 plumbing shared by the node collectors.
//!
//! Each call is a single POST with an empty `params` array, bounded by a
//! hard deadline and never retried.

mod client;
mod envelope;

use std::time::Duration;

use thiserror::Error;

pub use client::{RpcClient, DEFAULT_RPC_TIMEOUT};
pub use envelope::{RpcEnvelope, RpcRequest};

#[derive(Debug, Error)]
pub enum RpcError {
    #[error("invalid rpc endpoint '{endpoint}': {reason}")]
    InvalidEndpoint { endpoint: String, reason: String },

    #[error("failed to build request: {0}")]
    Request(#[source] reqwest::Error),

    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    #[error("transport error: {0}")]
    Transport(#[source] reqwest::Error),

    #[error("unexpected status code: {0}")]
    Status(reqwest::StatusCode),

    #[error("failed to read response body: {0}")]
    Body(#[source] reqwest::Error),

    #[error("failed to decode response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("remote error {code}: {message}")]
    Remote { code: i64, message: String },

    #[error("response has no result")]
    MissingResult,

    #[error("response field '{0}' is missing or empty")]
    EmptyField(&'static str),
}
