use std::sync::Arc;

use chain_exporter::config::{load_config, print_schema};
use chain_exporter::startup;
use chain_exporter::utils::logger::init_logging;
use tracing::error;

#[tokio::main]
async fn main() {
    if std::env::args().skip(1).any(|arg| arg == "--schema") {
        if let Err(e) = print_schema() {
            eprintln!("Error printing configuration schema: {}", e);
            std::process::exit(1);
        }
        return;
    }

    let config = match load_config() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error loading configuration: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = init_logging(&config.logging) {
        eprintln!("Error initializing logging: {}", e);
        std::process::exit(1);
    }

    if let Err(e) = startup::run(Arc::new(config)).await {
        error!("{}", e);
        std::process::exit(1);
    }
}
