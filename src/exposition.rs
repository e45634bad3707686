//! Background HTTP listener serving the instruments on `/metrics`.
//!
//! The listener is independent of the host pipeline's own socket and runs
//! until the process exits.

use std::sync::Arc;

use tokio::net::TcpListener;
use tracing::{error, info};

use crate::error::MetricsError;
use crate::metrics::Instruments;
use crate::routes;

/// Launcher for the exposition endpoint.
pub struct ExpositionServer;

impl ExpositionServer {
    /// Spawns the listener for `port` in the background.
    ///
    /// The listener runs on a dedicated thread with its own runtime, so it
    /// outlives whichever runtime the caller is on. Errors are logged and
    /// end the listener, they are never returned.
    pub fn spawn(port: u16, instruments: Arc<Instruments>) {
        let task = async move {
            if let Err(e) = bind_and_serve(port, instruments).await {
                error!(
                    event_name = "metrics.exposition.failed",
                    event_domain = "metrics",
                    port,
                    error = %e,
                    "Advanced metrics exposition stopped"
                );
            }
        };

        let spawned = std::thread::Builder::new()
            .name("metrics-exposition".to_string())
            .spawn(move || {
                match tokio::runtime::Builder::new_current_thread()
                    .enable_all()
                    .build()
                {
                    Ok(runtime) => runtime.block_on(task),
                    Err(e) => error!(port, error = %e, "Could not build exposition runtime"),
                }
            });
        if let Err(e) = spawned {
            error!(port, error = %e, "Could not spawn exposition thread");
        }
    }
}

async fn bind_and_serve(port: u16, instruments: Arc<Instruments>) -> Result<(), MetricsError> {
    let listener = TcpListener::bind(("0.0.0.0", port))
        .await
        .map_err(|source| MetricsError::Bind { port, source })?;
    info!("Starting advanced metrics on port {}", port);
    serve(listener, instruments).await
}

/// Serves `GET /metrics` on an already bound listener.
pub async fn serve(listener: TcpListener, instruments: Arc<Instruments>) -> Result<(), MetricsError> {
    let app = routes::create_exposition_router(instruments);
    axum::serve(listener, app).await.map_err(MetricsError::Serve)
}
