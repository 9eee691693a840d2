mod common;

use common::{v1_vars, TestApp};
use notification_relay::services::init_metrics;
use reqwest::StatusCode;

// The recorder is process-global, so this binary holds a single test.
#[tokio::test]
async fn metrics_endpoint_reports_http_and_relay_counters() {
    init_metrics().expect("Failed to install metrics recorder");

    let mut vars = v1_vars();
    vars.push(("FCM_DRY_RUN", "true".to_string()));
    let app = TestApp::spawn(vars).await;

    for _ in 0..3 {
        app.client
            .get(format!("{}/health", app.address))
            .send()
            .await
            .expect("Failed to execute request");
    }
    let response = app.post_notification(r#"{"title": "Hi"}"#).await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .client
        .get(format!("{}/metrics", app.address))
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(response.status(), StatusCode::OK);

    let scrape = response.text().await.expect("Failed to read metrics");
    assert!(
        scrape.contains("http_requests_total"),
        "http_requests_total missing from /metrics:\n{}",
        scrape
    );
    assert!(scrape.contains(r#"path="/health""#));
    assert!(scrape.contains("http_request_duration_seconds"));
    assert!(scrape.contains(r#"relay_notifications_total{mode="v1",outcome="sent"} 1"#));
}
