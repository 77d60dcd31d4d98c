//! Library exports for chain-exporter, shared between the binary and tests.

pub mod collector;
pub mod config;
pub mod metrics;
pub mod routes;
pub mod rpc;
pub mod scrape;
pub mod startup;
pub mod state;
pub mod utils;
