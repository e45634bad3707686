mod common;

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use advanced_metrics::metrics::MetricsRegistry;
use advanced_metrics::middleware::RequestInstrumentor;
use advanced_metrics::routes::create_router;
use axum::http::{Method, StatusCode};
use tower::ServiceExt;

use common::{
    BodyOnlyStage, BufferedWriter, bare_request, build_app, config, request, samples, scrape,
};

#[tokio::test]
async fn counter_only_hello_scenario() {
    let (app, registry) = build_app(config(true, false, 9100));

    let response = app
        .oneshot(request("/hello", Method::GET))
        .await
        .expect("request should succeed");
    assert_eq!(response.status(), StatusCode::OK);

    let text = scrape(&registry).await;
    assert_eq!(
        samples(&text, "requests_total"),
        vec![r#"requests_total{host="metrics.test",method="GET",path="/hello",status="200"} 1"#]
    );
    assert!(samples(&text, "request_duration_seconds_count").is_empty());
    assert!(text.contains("# TYPE request_duration_seconds histogram"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_identical_requests_are_counted_exactly() {
    const N: usize = 200;
    let (app, registry) = build_app(config(true, true, 47_101));

    let handles: Vec<_> = (0..N)
        .map(|_| {
            let app = app.clone();
            tokio::spawn(async move { app.oneshot(request("/hello", Method::GET)).await })
        })
        .collect();
    for handle in handles {
        let response = handle.await.expect("task joined").expect("request served");
        assert_eq!(response.status(), StatusCode::OK);
    }

    let instruments = registry.instruments().unwrap();
    let labels = ["GET", "/hello", "200", "metrics.test"];
    assert_eq!(
        instruments
            .requests_total
            .get_metric_with_label_values(&labels)
            .unwrap()
            .get(),
        N as f64
    );
    assert_eq!(
        instruments
            .request_duration
            .get_metric_with_label_values(&labels)
            .unwrap()
            .get_sample_count(),
        N as u64
    );
}

#[tokio::test]
async fn latency_disabled_adds_no_duration_samples() {
    let (app, registry) = build_app(config(true, false, 47_102));

    for _ in 0..25 {
        app.clone()
            .oneshot(request("/hello", Method::GET))
            .await
            .unwrap();
    }

    let text = scrape(&registry).await;
    assert!(samples(&text, "request_duration_seconds_count").is_empty());
    assert!(samples(&text, "request_duration_seconds_bucket").is_empty());
    assert_eq!(samples(&text, "requests_total").len(), 1);
}

#[tokio::test]
async fn latency_tracks_wall_clock_time() {
    let registry = Arc::new(MetricsRegistry::new());
    registry.start_once(Some(47_103)).unwrap();
    let instrumentor = RequestInstrumentor::new(config(false, true, 47_103), registry.clone());

    let stage = BodyOnlyStage {
        delay: Duration::from_millis(50),
    };
    let mut writer = BufferedWriter::default();
    instrumentor
        .instrument(&bare_request("/slow"), &mut writer, &stage)
        .await
        .expect("stage succeeds");

    let histogram = registry
        .instruments()
        .unwrap()
        .request_duration
        .get_metric_with_label_values(&["GET", "/slow", "200", "metrics.test"])
        .unwrap();
    assert_eq!(histogram.get_sample_count(), 1);
    let observed = histogram.get_sample_sum();
    assert!(observed >= 0.05, "observed {observed}s, slept 50ms");
    assert!(observed < 5.0, "observed {observed}s, slept 50ms");

    // counting is off for this stage
    let text = scrape(&registry).await;
    assert!(samples(&text, "requests_total").is_empty());
}

#[tokio::test]
async fn implicit_status_is_recorded_as_ok() {
    let registry = Arc::new(MetricsRegistry::new());
    registry.start_once(Some(47_104)).unwrap();
    let instrumentor = RequestInstrumentor::new(config(true, false, 47_104), registry.clone());

    let stage = BodyOnlyStage {
        delay: Duration::ZERO,
    };
    let mut writer = BufferedWriter::default();
    instrumentor
        .instrument(&bare_request("/implicit"), &mut writer, &stage)
        .await
        .expect("stage succeeds");

    assert_eq!(writer.body, b"hello");
    let text = scrape(&registry).await;
    assert_eq!(
        samples(&text, "requests_total"),
        vec![r#"requests_total{host="metrics.test",method="GET",path="/implicit",status="200"} 1"#]
    );
}

#[tokio::test]
async fn explicit_statuses_become_labels() {
    let (app, registry) = build_app(config(true, false, 47_105));

    for path in ["/status/404", "/status/503", "/status/404"] {
        app.clone().oneshot(request(path, Method::GET)).await.unwrap();
    }

    let counter = |path: &str, status: &str| {
        registry
            .instruments()
            .unwrap()
            .requests_total
            .get_metric_with_label_values(&["GET", path, status, "metrics.test"])
            .unwrap()
            .get()
    };
    assert_eq!(counter("/status/404", "404"), 2.0);
    assert_eq!(counter("/status/503", "503"), 1.0);
}

// Raw paths are used as labels without normalization, so the number of
// series follows the number of distinct paths seen.
#[tokio::test]
async fn series_grow_with_distinct_paths() {
    let (app, registry) = build_app(config(true, true, 47_106));

    for id in 0..20 {
        for _ in 0..3 {
            let path = format!("/status/{}", 200 + id);
            app.clone().oneshot(request(&path, Method::GET)).await.unwrap();
        }
    }

    let text = scrape(&registry).await;
    let counters = samples(&text, "requests_total");
    assert_eq!(counters.len(), 20);
    assert!(counters.iter().all(|line| line.ends_with(" 3")));

    let paths: HashSet<_> = samples(&text, "request_duration_seconds_count")
        .into_iter()
        .collect();
    assert_eq!(paths.len(), 20);
}

#[tokio::test]
async fn stages_with_different_flags_share_one_registry() {
    let registry = Arc::new(MetricsRegistry::new());
    registry.start_once(Some(47_107)).unwrap();

    let counting = create_router(config(true, false, 47_107), registry.clone());
    let timing = create_router(config(false, true, 47_107), registry.clone());

    counting
        .oneshot(request("/hello", Method::GET))
        .await
        .unwrap();
    timing
        .oneshot(request("/health", Method::GET))
        .await
        .unwrap();

    let text = scrape(&registry).await;
    assert_eq!(samples(&text, "requests_total").len(), 1);
    assert!(samples(&text, "requests_total")[0].contains(r#"path="/hello""#));
    let durations = samples(&text, "request_duration_seconds_count");
    assert_eq!(durations.len(), 1);
    assert!(durations[0].contains(r#"path="/health""#));
}
