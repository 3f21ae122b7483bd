//! Integration tests for the poll cycle against a stub device API.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use sck_collector::{CollectionError, PollOutcome, SmartCitizenCollector, WritePoint};
use tokio::net::TcpListener;

const DEVICE_JSON: &str = r#"{
    "id": 19396,
    "last_reading_at": "2024-01-01T00:00:00Z",
    "data": {
        "sensors": [
            {"id": 194, "name": "PM2.5", "unit": "ug/m3",
             "value": 12.3, "last_reading_at": "2024-01-01T00:00:00Z"},
            {"id": 55, "name": "SHT31 - Temperature", "unit": "C",
             "value": 21.5, "last_reading_at": "2024-01-01T00:00:00Z"}
        ]
    }
}"#;

/// Serve the given router on an ephemeral port and return its base URL.
async fn start_stub_api(router: Router) -> String {
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
async fn server_error_produces_no_points_and_next_poll_recovers() {
    // First request fails with 500, the second returns a valid body.
    let calls = Arc::new(AtomicUsize::new(0));
    let handler_calls = Arc::clone(&calls);
    let router = Router::new().route(
        "/devices/19396",
        get(move || {
            let calls = Arc::clone(&handler_calls);
            async move {
                if calls.fetch_add(1, Ordering::SeqCst) == 0 {
                    (StatusCode::INTERNAL_SERVER_ERROR, "boom").into_response()
                } else {
                    (
                        [(header::CONTENT_TYPE, "application/json")],
                        DEVICE_JSON,
                    )
                        .into_response()
                }
            }
        }),
    );

    let base = start_stub_api(router).await;
    let mut collector = SmartCitizenCollector::new(&base, "19396").unwrap();

    match collector.poll().await {
        Err(CollectionError::ApiStatus(500)) => {}
        other => panic!("expected ApiStatus(500), got {:?}", other),
    }

    // The failed tick left no state behind; the next poll succeeds and
    // yields one point per sensor, tagged with the device id.
    let readings = match collector.poll().await {
        Ok(PollOutcome::Fresh { readings, .. }) => readings,
        other => panic!("expected fresh readings, got {:?}", other),
    };
    let points: Vec<WritePoint> = readings
        .iter()
        .map(|r| WritePoint::from_reading(r, "19396"))
        .collect();
    assert_eq!(points.len(), 2);
    assert!(points.iter().all(|p| p.device_id == "19396"));
    assert_eq!(points[0].sensor_name, "pm_2_5");
    assert_eq!(points[0].value, 12.3);
    assert_eq!(points[1].sensor_name, "temperature");
    assert_eq!(points[1].value, 21.5);
}

#[tokio::test]
async fn non_json_body_is_a_parse_error() {
    let router = Router::new().route(
        "/devices/19396",
        get(|| async { "<html>service temporarily unavailable</html>" }),
    );
    let base = start_stub_api(router).await;
    let mut collector = SmartCitizenCollector::new(&base, "19396").unwrap();

    match collector.poll().await {
        Err(CollectionError::Parse(_)) => {}
        other => panic!("expected a parse error, got {:?}", other),
    }
}

#[tokio::test]
async fn wrong_shaped_json_is_a_parse_error() {
    let router = Router::new().route(
        "/devices/19396",
        get(|| async {
            (
                [(header::CONTENT_TYPE, "application/json")],
                r#"{"data": "no sensors here"}"#,
            )
        }),
    );
    let base = start_stub_api(router).await;
    let mut collector = SmartCitizenCollector::new(&base, "19396").unwrap();

    match collector.poll().await {
        Err(CollectionError::Parse(_)) => {}
        other => panic!("expected a parse error, got {:?}", other),
    }
}
