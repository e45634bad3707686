//! The fixed instrument set and its text rendering.

use prometheus::{
    CounterVec, Encoder, HistogramVec, Opts, Registry, TextEncoder, exponential_buckets,
    register_counter_vec_with_registry, register_histogram_vec_with_registry,
};

use super::summary::SummaryVec;
use crate::error::MetricsError;

pub const REQUESTS_TOTAL: &str = "requests_total";
pub const REQUEST_DURATION_SECONDS: &str = "request_duration_seconds";
pub const REQUEST_SIZE_BYTES: &str = "request_size_bytes";
pub const RESPONSE_SIZE_BYTES: &str = "response_size_bytes";

/// Label names shared by every instrument, in recording order.
pub const LABELS: [&str; 4] = ["method", "path", "status", "host"];

/// Families always announced by the exposition, with their help and type.
const FAMILIES: [(&str, &str, &str); 4] = [
    (REQUESTS_TOTAL, "Number of requests", "counter"),
    (REQUEST_DURATION_SECONDS, "Latency for HTTP requests.", "histogram"),
    (REQUEST_SIZE_BYTES, "Size of HTTP requests.", "summary"),
    (RESPONSE_SIZE_BYTES, "Size of HTTP responses.", "summary"),
];

/// The four request instruments and the registry they are registered with.
///
/// `request_size` and `response_size` are registered so their family names
/// stay visible to scrapers, but nothing records into them yet.
pub struct Instruments {
    registry: Registry,
    pub requests_total: CounterVec,
    pub request_duration: HistogramVec,
    pub request_size: SummaryVec,
    pub response_size: SummaryVec,
}

impl Instruments {
    /// Builds every instrument and registers it with a fresh registry.
    pub fn new() -> Result<Self, MetricsError> {
        let registry = Registry::new();
        Self::register_all(registry)
    }

    /// Builds every instrument and registers it with `registry`.
    ///
    /// Fails if any family name is already taken in `registry`.
    pub fn register_all(registry: Registry) -> Result<Self, MetricsError> {
        let requests_total = register_counter_vec_with_registry!(
            Opts::new(FAMILIES[0].0, FAMILIES[0].1),
            &LABELS,
            registry
        )
        .map_err(MetricsError::Register)?;

        let request_duration = register_histogram_vec_with_registry!(
            FAMILIES[1].0,
            FAMILIES[1].1,
            &LABELS,
            exponential_buckets(0.1, 1.5, 10).map_err(MetricsError::Register)?,
            registry
        )
        .map_err(MetricsError::Register)?;

        let request_size = SummaryVec::new(FAMILIES[2].0, FAMILIES[2].1, &LABELS)
            .map_err(MetricsError::Register)?;
        registry
            .register(Box::new(request_size.clone()))
            .map_err(MetricsError::Register)?;

        let response_size = SummaryVec::new(FAMILIES[3].0, FAMILIES[3].1, &LABELS)
            .map_err(MetricsError::Register)?;
        registry
            .register(Box::new(response_size.clone()))
            .map_err(MetricsError::Register)?;

        Ok(Instruments {
            registry,
            requests_total,
            request_duration,
            request_size,
            response_size,
        })
    }

    /// Instrument set whose counter declares `counter_labels` instead of
    /// [`LABELS`], so recording into it fails with a cardinality error.
    #[cfg(test)]
    pub(crate) fn with_counter_labels(counter_labels: &[&str]) -> Self {
        let registry = Registry::new();
        let requests_total = CounterVec::new(Opts::new(REQUESTS_TOTAL, "test"), counter_labels)
            .expect("valid counter");
        let request_duration = HistogramVec::new(
            prometheus::HistogramOpts::new(REQUEST_DURATION_SECONDS, "test"),
            &LABELS,
        )
        .expect("valid histogram");
        let request_size =
            SummaryVec::new(REQUEST_SIZE_BYTES, "test", &LABELS).expect("valid summary");
        let response_size =
            SummaryVec::new(RESPONSE_SIZE_BYTES, "test", &LABELS).expect("valid summary");
        Instruments {
            registry,
            requests_total,
            request_duration,
            request_size,
            response_size,
        }
    }

    /// Renders all metrics in Prometheus text format.
    ///
    /// Families that have no samples yet are still announced with their
    /// `# HELP` and `# TYPE` lines.
    pub fn render(&self) -> Result<String, MetricsError> {
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        TextEncoder::new()
            .encode(&metric_families, &mut buffer)
            .map_err(MetricsError::Encode)?;

        for (name, help, kind) in FAMILIES {
            if metric_families.iter().any(|mf| mf.get_name() == name) {
                continue;
            }
            buffer.extend_from_slice(format!("# HELP {name} {help}\n# TYPE {name} {kind}\n").as_bytes());
        }

        String::from_utf8(buffer).map_err(|e| {
            MetricsError::Encode(prometheus::Error::Msg(format!(
                "metrics encoding produced invalid UTF-8: {e}"
            )))
        })
    }
}
