//! HTTP surface: `/metrics` for Prometheus and `/health` for liveness probes.

mod health_routes;
mod metrics;

use crate::state::AppState;
use axum::Router;

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .merge(metrics::routes())
        .merge(health_routes::routes())
        .with_state(state)
}
