//! Shared helpers for collector unit tests.

use std::net::TcpListener as StdTcpListener;
use std::time::Duration;

use tokio::net::TcpListener;
use tracing::Span;

use super::FactoryContext;
use crate::config::CollectorSettings;

pub fn context(name: &str, endpoint: &str, rpc_timeout: Duration) -> FactoryContext {
    FactoryContext {
        name: name.to_string(),
        span: Span::none(),
        settings: CollectorSettings {
            enabled: None,
            rpc: Some(endpoint.to_string()),
        },
        rpc_timeout,
    }
}

/// An endpoint that accepts connections but never answers.
pub async fn silent_endpoint() -> String {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("failed to bind listener");
    let addr = listener.local_addr().expect("listener has no address");
    tokio::spawn(async move {
        let mut held = Vec::new();
        while let Ok((socket, _)) = listener.accept().await {
            held.push(socket);
        }
    });
    format!("http://{}", addr)
}

/// An endpoint nothing listens on.
pub fn refused_endpoint() -> String {
    let listener = StdTcpListener::bind("127.0.0.1:0").expect("failed to bind listener");
    let addr = listener.local_addr().expect("listener has no address");
    drop(listener);
    format!("http://{}", addr)
}
