//! Per-request instrumentation around the next pipeline stage.

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use http::{Request, StatusCode};
use tracing::{debug, warn};

use super::capture::{ResponseWriter, StatusCapture};
use crate::config::InstrumentationConfig;
use crate::error::MetricsError;
use crate::metrics::{Instruments, MetricsRegistry};
use crate::utils::log_throttle::should_emit;

const OBSERVATION_FAILURE_LOG_WINDOW: Duration = Duration::from_secs(60);

/// The next stage of a writer-style pipeline.
#[async_trait]
pub trait NextStage<B: Send + Sync>: Send + Sync {
    type Error: Send;

    async fn serve(
        &self,
        request: &Request<B>,
        writer: &mut dyn ResponseWriter,
    ) -> Result<(), Self::Error>;
}

/// Labels and start time of one in-flight request.
#[derive(Debug, Clone)]
pub struct RequestObservation {
    pub method: String,
    /// Raw request path, not normalized. Every distinct path becomes its
    /// own series.
    pub path: String,
    pub status: StatusCode,
    pub host: String,
    pub start: Instant,
}

impl RequestObservation {
    /// Takes the labels from `request` and starts the clock.
    pub fn begin<B>(request: &Request<B>) -> Self {
        let host = request
            .headers()
            .get(http::header::HOST)
            .and_then(|value| value.to_str().ok())
            .or_else(|| request.uri().authority().map(|a| a.as_str()))
            .unwrap_or("")
            .to_string();

        RequestObservation {
            method: request.method().as_str().to_string(),
            path: request.uri().path().to_string(),
            status: StatusCode::OK,
            host,
            start: Instant::now(),
        }
    }

    pub fn with_status(mut self, status: StatusCode) -> Self {
        self.status = status;
        self
    }

    /// Label values in the order of [`crate::metrics::LABELS`].
    pub fn label_values(&self) -> [&str; 4] {
        [
            self.method.as_str(),
            self.path.as_str(),
            self.status.as_str(),
            self.host.as_str(),
        ]
    }
}

/// Times a pipeline stage and feeds the outcome into the shared registry.
///
/// Each stage instance holds its own flags; all of them share one
/// [`MetricsRegistry`].
#[derive(Clone)]
pub struct RequestInstrumentor {
    config: InstrumentationConfig,
    registry: Arc<MetricsRegistry>,
}

impl RequestInstrumentor {
    pub fn new(config: InstrumentationConfig, registry: Arc<MetricsRegistry>) -> Self {
        RequestInstrumentor { config, registry }
    }

    pub fn config(&self) -> &InstrumentationConfig {
        &self.config
    }

    /// Runs `next` with a status-capturing writer and records the request.
    ///
    /// Whatever `next` returns is handed back untouched.
    pub async fn instrument<B, N>(
        &self,
        request: &Request<B>,
        writer: &mut dyn ResponseWriter,
        next: &N,
    ) -> Result<(), N::Error>
    where
        B: Send + Sync,
        N: NextStage<B> + ?Sized,
    {
        let observation = RequestObservation::begin(request);
        debug!(
            host = observation.host.as_str(),
            path = observation.path.as_str(),
            counter = self.config.counter,
            latency = self.config.latency,
            "Instrumenting request"
        );
        let mut capture = StatusCapture::new(writer);
        let result = next.serve(request, &mut capture).await;

        self.record(&observation.with_status(capture.status()));
        result
    }

    /// Records a finished request. Never fails: errors and panics raised by
    /// the instruments are logged and the observation is dropped.
    pub fn record(&self, observation: &RequestObservation) {
        if !self.config.counter && !self.config.latency {
            return;
        }
        let elapsed = observation.start.elapsed();

        let Some(instruments) = self.registry.instruments() else {
            debug!("Metrics registry not started; observation dropped");
            return;
        };

        let _ = self.contain(observation, || {
            self.apply(&instruments, observation, elapsed)
        });
    }

    /// Runs `update`, turning a panic into [`MetricsError::Panicked`] and
    /// logging any failure under the observation-failure throttle.
    fn contain<F>(&self, observation: &RequestObservation, update: F) -> Result<(), MetricsError>
    where
        F: FnOnce() -> Result<(), MetricsError>,
    {
        let err = match panic::catch_unwind(AssertUnwindSafe(update)) {
            Ok(Ok(())) => return Ok(()),
            Ok(Err(e)) => e,
            Err(payload) => MetricsError::Panicked(panic_message(payload.as_ref())),
        };

        if let Some(suppressed_count) =
            should_emit("metrics.observation.failed", OBSERVATION_FAILURE_LOG_WINDOW)
        {
            warn!(
                event_name = "metrics.observation.failed",
                event_domain = "metrics",
                method = observation.method.as_str(),
                path = observation.path.as_str(),
                error = %err,
                suppressed_count,
                "request observation was not recorded"
            );
        }
        Err(err)
    }

    fn apply(
        &self,
        instruments: &Instruments,
        observation: &RequestObservation,
        elapsed: Duration,
    ) -> Result<(), MetricsError> {
        let labels = observation.label_values();

        if self.config.counter {
            instruments
                .requests_total
                .get_metric_with_label_values(&labels)
                .map_err(MetricsError::Observation)?
                .inc();
        }
        if self.config.latency {
            instruments
                .request_duration
                .get_metric_with_label_values(&labels)
                .map_err(MetricsError::Observation)?
                .observe(elapsed.as_secs_f64());
        }
        Ok(())
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
