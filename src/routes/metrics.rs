//! Metrics exposition endpoint.

use crate::metrics::{render, ExpositionError};
use crate::state::AppState;
use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use tracing::{debug, error};

/// Creates the metrics route.
pub fn routes() -> Router<AppState> {
    Router::new().route("/metrics", get(metrics_handler))
}

/// Handler for the /metrics endpoint.
///
/// Every request triggers a scrape of all enabled collectors. Collector
/// failures still yield a 200 with sentinel samples; only an encoding
/// failure turns into a 500.
async fn metrics_handler(State(state): State<AppState>) -> Response {
    let report = state.scraper.scrape().await;
    debug!(
        collectors = report.outcomes.len(),
        failures = report.failures(),
        "scrape finished"
    );

    match render_all(&state, &report.samples) {
        Ok(metrics_text) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4; charset=utf-8")],
            metrics_text,
        )
            .into_response(),
        Err(e) => {
            error!(error = %e, "failed to render metrics");
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response()
        }
    }
}

fn render_all(
    state: &AppState,
    samples: &[crate::metrics::Sample],
) -> Result<String, ExpositionError> {
    let mut text = render(samples)?;
    text.push_str(&state.metrics.render()?);
    Ok(text)
}
