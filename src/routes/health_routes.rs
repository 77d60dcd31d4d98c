//! Liveness endpoint.

use crate::state::AppState;
use axum::{routing::get, Router};

pub fn routes() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}

/// Answers while the process is up. Node reachability is reported through
/// `/metrics` instead.
async fn health_check() -> &'static str {
    "OK"
}
