#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use advanced_metrics::config::InstrumentationConfig;
use advanced_metrics::metrics::MetricsRegistry;
use advanced_metrics::middleware::{NextStage, ResponseWriter};
use advanced_metrics::routes::{create_exposition_router, create_router};
use async_trait::async_trait;
use axum::body::{Body, to_bytes};
use axum::http::{HeaderMap, Method, Request, StatusCode};
use axum::Router;
use tower::ServiceExt;

pub fn config(counter: bool, latency: bool, port: u16) -> InstrumentationConfig {
    InstrumentationConfig {
        counter,
        latency,
        port: Some(port),
    }
}

/// Starts a fresh registry on `port` and builds the demo host around it.
pub fn build_app(config: InstrumentationConfig) -> (Router, Arc<MetricsRegistry>) {
    let registry = Arc::new(MetricsRegistry::new());
    registry
        .start_once(config.port)
        .expect("registry should start");
    (create_router(config, registry.clone()), registry)
}

pub fn request(path: &str, method: Method) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(path)
        .header("host", "metrics.test")
        .body(Body::empty())
        .expect("failed to build request")
}

/// Fetches `/metrics` through the exposition router without a socket.
pub async fn scrape(registry: &MetricsRegistry) -> String {
    let instruments = registry.instruments().expect("registry started");
    let response = create_exposition_router(instruments)
        .oneshot(request("/metrics", Method::GET))
        .await
        .expect("scrape should complete");
    assert_eq!(response.status(), StatusCode::OK);

    let body = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body should be readable");
    String::from_utf8(body.to_vec()).expect("metrics are UTF-8")
}

/// Sample lines (no comments) whose metric name is exactly `name`.
pub fn samples<'a>(text: &'a str, name: &str) -> Vec<&'a str> {
    let prefix = format!("{}{{", name);
    text.lines().filter(|l| l.starts_with(&prefix)).collect()
}

pub fn bare_request(path: &str) -> Request<()> {
    Request::builder()
        .method(Method::GET)
        .uri(path)
        .header("host", "metrics.test")
        .body(())
        .expect("failed to build request")
}

/// Writer-style sink collecting what a stage wrote.
#[derive(Default)]
pub struct BufferedWriter {
    pub headers: HeaderMap,
    pub status: Option<StatusCode>,
    pub body: Vec<u8>,
}

impl ResponseWriter for BufferedWriter {
    fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    fn write_status(&mut self, status: StatusCode) {
        self.status.get_or_insert(status);
    }

    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.status.get_or_insert(StatusCode::OK);
        self.body.extend_from_slice(buf);
        Ok(buf.len())
    }
}

/// Stage that writes a body without ever setting a status, after `delay`.
pub struct BodyOnlyStage {
    pub delay: Duration,
}

#[async_trait]
impl NextStage<()> for BodyOnlyStage {
    type Error = std::io::Error;

    async fn serve(
        &self,
        _request: &Request<()>,
        writer: &mut dyn ResponseWriter,
    ) -> Result<(), std::io::Error> {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        writer.write(b"hello")?;
        Ok(())
    }
}
