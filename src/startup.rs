//! Demo host startup.
//!
//! Starts the shared metrics registry and serves the sample application
//! with the metrics layer mounted on every route.

use std::sync::Arc;

use tokio::net::TcpListener;
use tracing::{info, warn};

use crate::config::ConfigV1;
use crate::metrics::{MetricsRegistry, StartOutcome};
use crate::routes;

/// Initializes the registry and runs the demo host server.
///
/// A registry that fails to start is logged and the host keeps serving
/// without metrics.
///
/// # Errors
///
/// Returns an error if the host fails to bind `bind_address` or stops with
/// a runtime error.
pub async fn run(config: Arc<ConfigV1>) -> Result<(), Box<dyn std::error::Error>> {
    let registry = Arc::new(MetricsRegistry::new());
    match registry.start_once(config.metrics.port) {
        Ok(StartOutcome::Started) => info!(port = registry.port(), "Metrics registry started"),
        Ok(StartOutcome::AlreadyStarted) => {}
        Err(e) => warn!(error = %e, "Metrics disabled: registry failed to start"),
    }

    let app = routes::create_router(config.metrics.clone(), registry);

    info!("Starting server on {}", config.bind_address);
    let listener = TcpListener::bind(&config.bind_address).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
