mod common;

use common::{fetcher, DEVICE_TOKEN};
use humidity_service::config::ExpoConfig;
use humidity_service::services::{
    get_metrics, init_metrics, ExpoProvider, MockPushProvider, PushProvider,
};
use humidity_service::workers::{AlertSettings, CheckOutcome, HumidityMonitor, MonitorError};
use secrecy::Secret;
use serde_json::json;
use std::sync::{Arc, Once};
use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

static INIT_METRICS: Once = Once::new();

fn ensure_metrics_initialized() {
    INIT_METRICS.call_once(init_metrics);
}

fn settings() -> AlertSettings {
    AlertSettings {
        threshold: 30.0,
        title: "Alerta de Umidade".to_string(),
        device_token: DEVICE_TOKEN.to_string(),
    }
}

async fn sensor_with(body: serde_json::Value) -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/sensor"))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(&server)
        .await;
    server
}

fn monitor(
    sensor: &MockServer,
    push_provider: Arc<dyn PushProvider>,
    interval: Duration,
) -> HumidityMonitor {
    HumidityMonitor::new(
        fetcher(&format!("{}/sensor", sensor.uri()), Duration::from_secs(600)),
        push_provider,
        settings(),
        interval,
    )
}

#[tokio::test]
async fn low_humidity_sends_exactly_one_push() {
    let sensor = sensor_with(json!({"humidity": 25})).await;
    let push = Arc::new(MockPushProvider::new(true));
    let monitor = monitor(&sensor, push.clone(), Duration::from_secs(300));

    let outcome = monitor.check_once().await.unwrap();

    assert_eq!(outcome, CheckOutcome::Alerted { humidity: 25.0 });
    let sent = push.sent_messages();
    assert_eq!(sent.len(), 1);
    assert!(sent[0].body.contains("25"), "body was: {}", sent[0].body);
    assert_eq!(sent[0].title, "Alerta de Umidade");
    assert_eq!(sent[0].device_token, DEVICE_TOKEN);
    assert_eq!(sent[0].sound.as_deref(), Some("default"));
}

#[tokio::test]
async fn normal_humidity_sends_nothing() {
    let sensor = sensor_with(json!({"humidity": 45})).await;
    let push = Arc::new(MockPushProvider::new(true));
    let monitor = monitor(&sensor, push.clone(), Duration::from_secs(300));

    let outcome = monitor.check_once().await.unwrap();

    assert_eq!(outcome, CheckOutcome::Normal { humidity: 45.0 });
    assert_eq!(push.send_count(), 0);
}

#[tokio::test]
async fn humidity_at_threshold_sends_nothing() {
    let sensor = sensor_with(json!({"humidity": 30})).await;
    let push = Arc::new(MockPushProvider::new(true));
    let monitor = monitor(&sensor, push.clone(), Duration::from_secs(300));

    monitor.check_once().await.unwrap();

    assert_eq!(push.send_count(), 0);
}

#[tokio::test]
async fn missing_humidity_sends_nothing() {
    let sensor = sensor_with(json!({"humidity": null})).await;
    let push = Arc::new(MockPushProvider::new(true));
    let monitor = monitor(&sensor, push.clone(), Duration::from_secs(300));

    let outcome = monitor.check_once().await.unwrap();

    assert_eq!(outcome, CheckOutcome::NoReading);
    assert_eq!(push.send_count(), 0);
}

#[tokio::test]
async fn fetch_failure_is_reported_without_push() {
    let sensor = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&sensor)
        .await;
    let push = Arc::new(MockPushProvider::new(true));
    let monitor = monitor(&sensor, push.clone(), Duration::from_secs(300));

    let err = monitor.check_once().await.unwrap_err();

    assert!(matches!(err, MonitorError::Fetch(_)));
    assert_eq!(push.send_count(), 0);
}

#[tokio::test]
async fn push_failure_is_reported() {
    let sensor = sensor_with(json!({"humidity": 10})).await;
    let push = Arc::new(MockPushProvider::new(false));
    let monitor = monitor(&sensor, push, Duration::from_secs(300));

    let err = monitor.check_once().await.unwrap_err();

    assert!(matches!(err, MonitorError::Notify(_)));
}

#[tokio::test]
async fn low_humidity_posts_to_expo_gateway() {
    let sensor = sensor_with(json!({"humidity": 25})).await;
    let gateway = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/push/send"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"data": {"status": "ok", "id": "t-1"}})),
        )
        .expect(1)
        .mount(&gateway)
        .await;

    let expo = ExpoProvider::new(ExpoConfig {
        api_url: format!("{}/push/send", gateway.uri()),
        token: Secret::new(DEVICE_TOKEN.to_string()),
        timeout_secs: 5,
        enabled: true,
    })
    .unwrap();
    let monitor = monitor(&sensor, Arc::new(expo), Duration::from_secs(300));

    monitor.check_once().await.unwrap();

    let requests = gateway.received_requests().await.unwrap();
    let body: serde_json::Value = serde_json::from_slice(&requests[0].body).unwrap();
    assert_eq!(body["to"], DEVICE_TOKEN);
    assert_eq!(body["sound"], "default");
    assert_eq!(body["title"], "Alerta de Umidade");
    assert!(body["body"].as_str().unwrap().contains("25"));
}

#[tokio::test]
async fn loop_alerts_on_each_tick_until_shutdown() {
    let sensor = sensor_with(json!({"humidity": 12})).await;
    let push = Arc::new(MockPushProvider::new(true));
    let monitor = monitor(&sensor, push.clone(), Duration::from_millis(100));

    let handle = monitor.start();
    tokio::time::sleep(Duration::from_millis(350)).await;
    monitor.shutdown();

    tokio::time::timeout(Duration::from_secs(2), handle)
        .await
        .expect("monitor did not stop after shutdown")
        .expect("monitor task panicked");

    let sent = push.send_count();
    assert!(sent >= 2, "expected at least two alerts, got {}", sent);

    let after_shutdown = push.send_count();
    tokio::time::sleep(Duration::from_millis(250)).await;
    assert_eq!(push.send_count(), after_shutdown);
}

#[tokio::test]
async fn loop_survives_failing_checks() {
    let sensor = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&sensor)
        .await;
    let push = Arc::new(MockPushProvider::new(true));
    let monitor = monitor(&sensor, push.clone(), Duration::from_millis(50));

    let handle = monitor.start();
    tokio::time::sleep(Duration::from_millis(300)).await;

    assert!(!handle.is_finished(), "monitor loop should keep running");
    let requests = sensor.received_requests().await.unwrap();
    assert!(requests.len() >= 2, "expected repeated checks, got {}", requests.len());

    monitor.shutdown();
    tokio::time::timeout(Duration::from_secs(2), handle)
        .await
        .expect("monitor did not stop after shutdown")
        .expect("monitor task panicked");
    assert_eq!(push.send_count(), 0);
}

#[tokio::test]
async fn first_check_waits_one_interval() {
    let sensor = sensor_with(json!({"humidity": 12})).await;
    let push = Arc::new(MockPushProvider::new(true));
    let monitor = monitor(&sensor, push.clone(), Duration::from_secs(60));

    let handle = monitor.start();
    tokio::time::sleep(Duration::from_millis(200)).await;

    assert_eq!(push.send_count(), 0);
    assert!(sensor.received_requests().await.unwrap().is_empty());

    monitor.shutdown();
    handle.await.unwrap();
}

#[tokio::test]
async fn alert_metric_is_labelled_with_provider() {
    ensure_metrics_initialized();
    let sensor = sensor_with(json!({"humidity": 25})).await;
    let push = Arc::new(MockPushProvider::new(true));
    let monitor = monitor(&sensor, push, Duration::from_secs(300));

    monitor.check_once().await.unwrap();

    let rendered = get_metrics();
    let labelled = rendered.lines().any(|line| {
        line.starts_with("humidity_alerts_total{")
            && line.contains(r#"provider="mock""#)
            && line.contains(r#"outcome="sent""#)
    });
    assert!(labelled, "no mock alert counter in:\n{}", rendered);
}
