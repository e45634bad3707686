//! Health check endpoints.

use axum::{Router, routing::get};

/// Registers health check routes.
pub fn routes() -> Router {
    Router::new().route("/health", get(health_check))
}

/// Liveness only: answers OK whether or not metrics are being exported.
async fn health_check() -> &'static str {
    "OK"
}
