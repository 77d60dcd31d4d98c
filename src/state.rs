//! Shared application state.
//!
//! Contains the state that is shared across all request handlers: the
//! configuration, the scraper holding every enabled collector, and the
//! exporter's own metrics.

use crate::config::ConfigV1;
use crate::metrics::Metrics;
use crate::scrape::Scraper;
use std::sync::Arc;

/// Application state shared across all HTTP handlers.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration loaded at startup.
    pub config: Arc<ConfigV1>,
    /// Runs the enabled collectors on every scrape.
    pub scraper: Arc<Scraper>,
    /// Self-metrics, appended to every scrape response.
    pub metrics: Metrics,
}
