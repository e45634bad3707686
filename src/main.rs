use std::sync::Arc;

use advanced_metrics::config::{load_config, print_schema};
use advanced_metrics::startup;
use advanced_metrics::utils::logger::init_logging;

#[tokio::main]
async fn main() {
    if std::env::args().any(|arg| arg == "--print-schema") {
        if let Err(e) = print_schema() {
            eprintln!("Failed to print schema: {}", e);
            std::process::exit(1);
        }
        return;
    }

    let config = Arc::new(load_config());

    if let Err(e) = init_logging(&config.logging) {
        eprintln!("{}", e);
        std::process::exit(1);
    }

    if let Err(e) = startup::run(config).await {
        tracing::error!(error = %e, "Server stopped");
        std::process::exit(1);
    }
}
