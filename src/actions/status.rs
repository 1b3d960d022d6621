//! Read-only views of the tracker's status snapshot

use axum::{
    Json,
    extract::State,
    http::{StatusCode, header},
    response::IntoResponse,
};

use super::views::{NearbyView, StatusView};
use crate::web::AppState;

/// Handler for GET /status
///
/// Current pointing and the locked target
pub async fn get_status(State(state): State<AppState>) -> impl IntoResponse {
    let snapshot = state.status.snapshot().await;
    (StatusCode::OK, Json(StatusView::from(snapshot.as_ref())))
}

/// Handler for GET /nearby
///
/// Traffic list, nearest first
pub async fn get_nearby(State(state): State<AppState>) -> impl IntoResponse {
    let snapshot = state.status.snapshot().await;
    let nearby: Vec<NearbyView> = snapshot.nearby.iter().map(NearbyView::from).collect();
    (StatusCode::OK, Json(nearby))
}

/// Handler for GET /metrics
pub async fn get_metrics(State(state): State<AppState>) -> impl IntoResponse {
    match &state.metrics {
        Some(handle) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            handle.render(),
        )
            .into_response(),
        None => (StatusCode::NOT_FOUND, "Metrics recorder not installed").into_response(),
    }
}
