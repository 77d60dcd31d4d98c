//! Application startup and server initialization.
//!
//! Builds the collector registry, instantiates the enabled collectors and
//! serves the HTTP routes until the process is asked to stop.

use std::sync::Arc;

use axum::Router;
use thiserror::Error;
use tokio::net::TcpListener;
use tracing::{info, warn};

use crate::collector::{default_registry, RegistryError};
use crate::config::ConfigV1;
use crate::metrics::Metrics;
use crate::routes;
use crate::scrape::Scraper;
use crate::state::AppState;

#[derive(Debug, Error)]
pub enum StartupError {
    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error("could not bind to {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: std::io::Error,
    },

    #[error("server error: {0}")]
    Serve(#[source] std::io::Error),
}

/// Builds the shared state: every enabled collector wrapped in a scraper.
pub fn build_state(config: Arc<ConfigV1>) -> Result<AppState, StartupError> {
    let registry = default_registry()?;
    let collectors = registry.instantiate(&config.collectors, config.rpc_timeout())?;
    if collectors.is_empty() {
        warn!("No collectors enabled; /metrics will only report exporter metrics");
    }

    let metrics = Metrics::new();
    let scraper = Arc::new(Scraper::new(collectors, metrics.clone()));
    Ok(AppState {
        config,
        scraper,
        metrics,
    })
}

/// Builds the router serving `/metrics` and `/health`.
pub fn build_app(config: Arc<ConfigV1>) -> Result<Router, StartupError> {
    Ok(routes::create_router(build_state(config)?))
}

/// Initializes and runs the exporter.
///
/// # Errors
///
/// Returns an error if a collector cannot be created, the server fails to
/// bind to the configured address, or the server stops with an I/O error.
pub async fn run(config: Arc<ConfigV1>) -> Result<(), StartupError> {
    let state = build_state(config.clone())?;
    info!(
        collectors = ?state.scraper.collector_names().collect::<Vec<_>>(),
        rpc_timeout_ms = config.rpc_timeout_in_ms,
        "Starting exporter on {}",
        config.bind_address
    );

    let app = routes::create_router(state);
    let listener = TcpListener::bind(&config.bind_address)
        .await
        .map_err(|source| StartupError::Bind {
            address: config.bind_address.clone(),
            source,
        })?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(StartupError::Serve)
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received, stopping server");
}
