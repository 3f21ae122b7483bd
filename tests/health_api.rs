//! Integration tests for the healthcheck endpoint.

use std::sync::Arc;

use sck_collector::shared::health::create_router;
use sck_collector::HealthState;
use tokio::net::TcpListener;

/// Start the health router on an ephemeral port and return its base URL.
async fn start_test_server(state: Arc<HealthState>) -> String {
    let router = create_router(state);

    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind random port");
    let addr = listener.local_addr().expect("Failed to get local addr");

    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });

    // Give the server time to start
    tokio::time::sleep(std::time::Duration::from_millis(50)).await;

    format!("http://{}", addr)
}

#[tokio::test]
async fn health_reports_status_and_counters() {
    let state = HealthState::new();
    state.record_poll();
    let base = start_test_server(Arc::clone(&state)).await;

    let response = reqwest::get(format!("{}/health", base))
        .await
        .expect("request failed");
    assert_eq!(response.status(), 200);

    let body: serde_json::Value = response.json().await.expect("invalid JSON body");
    assert_eq!(body["status"], "ok");
    assert_eq!(body["polls_total"], 1);
    assert!(body["last_poll"].is_string());
}

#[tokio::test]
async fn health_counts_polls_across_requests() {
    let state = HealthState::new();
    let base = start_test_server(Arc::clone(&state)).await;

    let before: serde_json::Value = reqwest::get(format!("{}/health", base))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(before["polls_total"], 0);
    assert!(before["last_poll"].is_null());

    state.record_poll();
    state.record_poll();

    let after: serde_json::Value = reqwest::get(format!("{}/health", base))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(after["polls_total"], 2);
}

#[tokio::test]
async fn unknown_paths_return_404() {
    let base = start_test_server(HealthState::new()).await;

    let response = reqwest::get(format!("{}/metrics", base))
        .await
        .expect("request failed");
    assert_eq!(response.status(), 404);
}
