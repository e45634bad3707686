//! Request instrumentation for host pipelines.
//!
//! Writer-style hosts call [`RequestInstrumentor::instrument`] with their
//! next stage; tower/axum hosts mount [`MetricsLayer`].

mod capture;
mod instrumentor;
mod layer;

pub use capture::{ResponseWriter, StatusCapture};
pub use instrumentor::{NextStage, RequestInstrumentor, RequestObservation};
pub use layer::{MetricsLayer, MetricsService};
