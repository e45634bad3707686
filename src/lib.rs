//! Library exports for advanced-metrics, shared between the binary and tests.
//!
//! Request instrumentation for HTTP pipelines: a shared registry started
//! once per process, a per-request instrumentor, and a `/metrics`
//! exposition listener.

pub mod config;
pub mod error;
pub mod exposition;
pub mod metrics;
pub mod middleware;
pub mod routes;
pub mod startup;
pub mod utils;

pub use error::MetricsError;
pub use metrics::{MetricsRegistry, StartOutcome};
pub use middleware::{MetricsLayer, RequestInstrumentor};
