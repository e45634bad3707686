//! Error types for the metrics subsystem.

use thiserror::Error;

/// Failures raised while starting, serving or updating metrics.
///
/// None of these ever reach the instrumented request path: the instrumentor
/// logs them and lets the request complete untouched.
#[derive(Debug, Error)]
pub enum MetricsError {
    /// An instrument could not be registered (e.g. a duplicate family name).
    #[error("failed to register instrument: {0}")]
    Register(#[source] prometheus::Error),

    /// The exposition listener could not bind its port.
    #[error("failed to bind exposition listener on port {port}: {source}")]
    Bind {
        port: u16,
        #[source]
        source: std::io::Error,
    },

    /// The exposition listener stopped with an I/O error.
    #[error("exposition server failed: {0}")]
    Serve(#[source] std::io::Error),

    /// The gathered families could not be encoded as text.
    #[error("failed to encode metrics: {0}")]
    Encode(#[source] prometheus::Error),

    /// An observation was rejected by an instrument (e.g. wrong label count).
    #[error("failed to record observation: {0}")]
    Observation(#[source] prometheus::Error),

    /// Recording panicked inside an instrument.
    #[error("instrument panicked while recording: {0}")]
    Panicked(String),
}
