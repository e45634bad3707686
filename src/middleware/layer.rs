//! Tower adapter: mounts the instrumentor on any `Service` pipeline.

use std::sync::Arc;
use std::task::{Context, Poll};

use futures::future::BoxFuture;
use http::{Request, Response, StatusCode};
use tower::{Layer, Service};

use super::instrumentor::{RequestInstrumentor, RequestObservation};
use crate::config::InstrumentationConfig;
use crate::metrics::MetricsRegistry;

/// Layer wrapping the inner service with request instrumentation.
#[derive(Clone)]
pub struct MetricsLayer {
    instrumentor: RequestInstrumentor,
}

impl MetricsLayer {
    pub fn new(config: InstrumentationConfig, registry: Arc<MetricsRegistry>) -> Self {
        MetricsLayer {
            instrumentor: RequestInstrumentor::new(config, registry),
        }
    }
}

impl<S> Layer<S> for MetricsLayer {
    type Service = MetricsService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        MetricsService {
            inner,
            instrumentor: self.instrumentor.clone(),
        }
    }
}

/// Service produced by [`MetricsLayer`].
///
/// The status label is the one on the returned response. If the inner
/// service fails there is no response, and the request is recorded as 200,
/// the status a writer reports when nothing was written.
#[derive(Clone)]
pub struct MetricsService<S> {
    inner: S,
    instrumentor: RequestInstrumentor,
}

impl<S, ReqBody, ResBody> Service<Request<ReqBody>> for MetricsService<S>
where
    S: Service<Request<ReqBody>, Response = Response<ResBody>>,
    S::Future: Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = BoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, request: Request<ReqBody>) -> Self::Future {
        let observation = RequestObservation::begin(&request);
        let instrumentor = self.instrumentor.clone();
        let future = self.inner.call(request);

        Box::pin(async move {
            let result = future.await;
            let status = match &result {
                Ok(response) => response.status(),
                Err(_) => StatusCode::OK,
            };
            instrumentor.record(&observation.with_status(status));
            result
        })
    }
}
