use std::net::TcpListener;
use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{Method, Request, StatusCode};
use axum::Router;
use chain_exporter::config::{CollectorSettings, CollectorsConfig, ConfigV1};
use chain_exporter::startup::build_app;
use mockito::{Matcher, Mock, Server};
use serde_json::json;
use tower::ServiceExt;

pub fn config_with(rpc_timeout_in_ms: u64, collectors: &[(&str, Option<&str>, Option<bool>)]) -> ConfigV1 {
    let collectors: CollectorsConfig = collectors
        .iter()
        .map(|(name, rpc, enabled)| {
            (
                name.to_string(),
                CollectorSettings {
                    enabled: *enabled,
                    rpc: rpc.map(str::to_string),
                },
            )
        })
        .collect();

    ConfigV1 {
        rpc_timeout_in_ms,
        collectors,
        ..ConfigV1::default()
    }
}

pub fn build_router(config: ConfigV1) -> Router {
    build_app(Arc::new(config)).expect("failed to build app")
}

pub async fn get(app: &Router, path: &str) -> (StatusCode, String) {
    let request = Request::builder()
        .method(Method::GET)
        .uri(path)
        .body(Body::empty())
        .expect("failed to build request");

    let response = app
        .clone()
        .oneshot(request)
        .await
        .expect("request should succeed");
    let status = response.status();
    let body = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("failed to read body");
    (
        status,
        String::from_utf8(body.to_vec()).expect("body is not UTF-8"),
    )
}

pub async fn mock_rpc(server: &mut Server, method: &str, status: usize, body: &str) -> Mock {
    server
        .mock("POST", "/")
        .match_body(Matcher::PartialJson(json!({ "jsonrpc": "2.0", "method": method })))
        .with_status(status)
        .with_header("content-type", "application/json")
        .with_body(body)
        .create_async()
        .await
}

/// An endpoint nothing listens on.
pub fn refused_endpoint() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").expect("failed to bind listener");
    let addr = listener.local_addr().expect("listener has no address");
    drop(listener);
    format!("http://{}", addr)
}
