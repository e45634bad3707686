//! Process-wide metrics registry with an idempotent start.

use std::sync::{Arc, Mutex, OnceLock};

use tracing::{debug, error, info};

use super::instruments::Instruments;
use crate::error::MetricsError;
use crate::exposition::ExpositionServer;

/// Port the exposition endpoint listens on when none is configured.
pub const DEFAULT_PORT: u16 = 6611;

/// What a call to [`MetricsRegistry::start_once`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartOutcome {
    /// This call built the instruments and launched the exposition server.
    Started,
    /// Another call already did; nothing happened.
    AlreadyStarted,
}

struct Started {
    port: u16,
    instruments: Arc<Instruments>,
}

/// Shared handle to the request instruments.
///
/// One registry is created per process and handed to every pipeline stage
/// as an `Arc<MetricsRegistry>`. The first `start_once` builds the
/// instruments and launches the exposition server; later calls are no-ops.
pub struct MetricsRegistry {
    started: OnceLock<Started>,
    start_lock: Mutex<()>,
}

impl MetricsRegistry {
    /// Creates an unstarted registry.
    pub fn new() -> Self {
        MetricsRegistry {
            started: OnceLock::new(),
            start_lock: Mutex::new(()),
        }
    }

    /// Builds and registers the instruments and launches the exposition
    /// server on `port` (or [`DEFAULT_PORT`] when `None` or `0`).
    ///
    /// Safe to call from many stages at once: exactly one caller gets
    /// [`StartOutcome::Started`]. A port that cannot be bound is logged by
    /// the listener task and does not surface here.
    pub fn start_once(&self, port: Option<u16>) -> Result<StartOutcome, MetricsError> {
        if self.started.get().is_some() {
            info!("Advanced metrics already started");
            return Ok(StartOutcome::AlreadyStarted);
        }

        let _guard = match self.start_lock.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        if self.started.get().is_some() {
            info!("Advanced metrics already started");
            return Ok(StartOutcome::AlreadyStarted);
        }

        let port = match port {
            Some(p) if p != 0 => p,
            _ => DEFAULT_PORT,
        };
        info!(
            event_name = "metrics.registry.start",
            event_domain = "metrics",
            port,
            "Starting advanced metrics server"
        );

        let instruments = match Instruments::new() {
            Ok(instruments) => Arc::new(instruments),
            Err(e) => {
                error!(
                    event_name = "metrics.registry.start_failed",
                    event_domain = "metrics",
                    error = %e,
                    "Failed to register instruments"
                );
                return Err(e);
            }
        };

        ExpositionServer::spawn(port, instruments.clone());

        if self.started.set(Started { port, instruments }).is_err() {
            debug!("Registry state was set while holding the start lock");
        }
        Ok(StartOutcome::Started)
    }

    /// Whether `start_once` has completed on this registry.
    pub fn is_started(&self) -> bool {
        self.started.get().is_some()
    }

    /// Port the exposition server was launched on, once started.
    pub fn port(&self) -> Option<u16> {
        self.started.get().map(|s| s.port)
    }

    /// The instrument set, once started.
    pub fn instruments(&self) -> Option<Arc<Instruments>> {
        self.started.get().map(|s| s.instruments.clone())
    }

    /// Started registry around `instruments`, without an exposition listener.
    #[cfg(test)]
    pub(crate) fn started_with(instruments: Arc<Instruments>) -> Self {
        let registry = Self::new();
        if registry
            .started
            .set(Started {
                port: DEFAULT_PORT,
                instruments,
            })
            .is_err()
        {
            unreachable!("fresh registry is unstarted");
        }
        registry
    }

    /// Renders the current state in Prometheus text format.
    ///
    /// Returns an empty string before the registry is started.
    pub fn render(&self) -> Result<String, MetricsError> {
        match self.started.get() {
            Some(started) => started.instruments.render(),
            None => Ok(String::new()),
        }
    }
}

impl Default for MetricsRegistry {
    fn default() -> Self {
        Self::new()
    }
}
