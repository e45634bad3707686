//! HTTP route definitions and handlers.
//!
//! Two routers live here: the exposition router served on the metrics
//! port, and the demo host application that gets instrumented.

mod health_routes;
mod hello_routes;
mod metrics;

use std::sync::Arc;

use axum::Router;

use crate::config::InstrumentationConfig;
use crate::metrics::{Instruments, MetricsRegistry};
use crate::middleware::MetricsLayer;

/// Router for the exposition listener: `GET /metrics` only.
pub fn create_exposition_router(instruments: Arc<Instruments>) -> Router {
    metrics::routes().with_state(instruments)
}

/// Creates the demo host router, every route wrapped in the metrics layer.
pub fn create_router(config: InstrumentationConfig, registry: Arc<MetricsRegistry>) -> Router {
    Router::new()
        .merge(hello_routes::routes())
        .merge(health_routes::routes())
        .layer(MetricsLayer::new(config, registry))
}
