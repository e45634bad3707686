//! Metrics collection and exposition for Prometheus.
//!
//! This module owns the shared registry and the fixed instrument set.

mod instruments;
mod registry;
mod summary;

pub use instruments::{
    Instruments, LABELS, REQUESTS_TOTAL, REQUEST_DURATION_SECONDS, REQUEST_SIZE_BYTES,
    RESPONSE_SIZE_BYTES,
};
pub use registry::{MetricsRegistry, StartOutcome, DEFAULT_PORT};
pub use summary::{SummarySeries, SummaryVec};
