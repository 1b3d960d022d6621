//! Dashboard routes served from a live status snapshot

mod common;

use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use http_body_util::BodyExt;
use std::time::Instant;
use tower::ServiceExt;

use common::{ScriptedFeed, aircraft, test_config};
use skytrack::dispatcher::CommandDispatcher;
use skytrack::events::EventSinks;
use skytrack::status::StatusReader;
use skytrack::tracker::Tracker;
use skytrack::web::{AppState, build_router};

async fn get(state: AppState, uri: &str) -> (StatusCode, Option<String>, Vec<u8>) {
    let response = build_router(state)
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();

    let status = response.status();
    let content_type = response
        .headers()
        .get(header::CONTENT_TYPE)
        .map(|value| value.to_str().unwrap().to_string());
    let body = response.into_body().collect().await.unwrap().to_bytes();
    (status, content_type, body.to_vec())
}

async fn get_json(state: AppState, uri: &str) -> serde_json::Value {
    let (status, _, body) = get(state, uri).await;
    assert_eq!(status, StatusCode::OK);
    serde_json::from_slice(&body).unwrap()
}

/// Reader over a snapshot produced by one status-only tracker cycle
async fn reader_after_one_poll(feed: ScriptedFeed) -> StatusReader {
    let config = test_config();
    let dispatcher = CommandDispatcher::status_only(&config.device);
    let mut tracker = Tracker::new(feed, &config, dispatcher, EventSinks::new());
    tracker.run_cycle(Instant::now()).await.unwrap();
    tracker.reader()
}

fn state(status: StatusReader) -> AppState {
    AppState {
        status,
        metrics: None,
    }
}

#[tokio::test]
async fn test_status_while_tracking() {
    let feed = ScriptedFeed::new(vec![Ok(vec![aircraft(
        "e48c1a",
        Some("GLO1234"),
        0.0,
        0.05,
        3000.0,
        5.0,
    )])]);
    let reader = reader_after_one_poll(feed).await;

    let json = get_json(state(reader), "/status").await;
    assert_eq!(json["az"], 90.0);
    assert_eq!(json["el"], 9.0);
    assert_eq!(json["dist"], 5.6);
    assert_eq!(json["target"], "GLO1234");
    assert!(json["updated_at"].is_string());
}

#[tokio::test]
async fn test_status_when_idle() {
    let reader = reader_after_one_poll(ScriptedFeed::default()).await;

    let json = get_json(state(reader), "/status").await;
    assert_eq!(json["target"], "N/A");
    assert_eq!(json["az"], 0.0);
}

#[tokio::test]
async fn test_nearby_is_sorted_and_capped() {
    // twelve aircraft in display range, listed farthest first
    let reports = (0..12)
        .rev()
        .map(|i| {
            aircraft(
                &format!("a0000{:x}", i),
                None,
                0.0,
                0.02 * (i + 1) as f64,
                12000.0,
                20.0,
            )
        })
        .collect();
    let reader = reader_after_one_poll(ScriptedFeed::new(vec![Ok(reports)])).await;

    let json = get_json(state(reader), "/nearby").await;
    let rows = json.as_array().unwrap();
    assert_eq!(rows.len(), 10);
    assert_eq!(rows[0]["flight"], "a00000");
    assert_eq!(rows[0]["alt"], 12000.0);
    assert_eq!(rows[0]["seen"], 20.0);

    let distances: Vec<f64> = rows.iter().map(|row| row["dist"].as_f64().unwrap()).collect();
    assert!(distances.windows(2).all(|pair| pair[0] <= pair[1]));
}

#[tokio::test]
async fn test_dashboard_page_is_served() {
    let reader = reader_after_one_poll(ScriptedFeed::default()).await;

    let (status, content_type, body) = get(state(reader.clone()), "/").await;
    assert_eq!(status, StatusCode::OK);
    assert!(content_type.unwrap().starts_with("text/html"));
    let page = String::from_utf8(body).unwrap();
    assert!(page.contains("/status"));
    assert!(page.contains("/nearby"));

    let (status, _, _) = get(state(reader), "/missing.js").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_metrics_without_recorder() {
    let reader = reader_after_one_poll(ScriptedFeed::default()).await;

    let (status, _, _) = get(state(reader), "/metrics").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
