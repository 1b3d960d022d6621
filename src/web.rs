use anyhow::{Context, Result};
use axum::{
    Router,
    body::Body,
    http::{HeaderValue, Request, StatusCode, Uri, header},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::get,
};
use include_dir::{Dir, include_dir};
use metrics_exporter_prometheus::PrometheusHandle;
use mime_guess::from_path;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use tower_http::cors::CorsLayer;
use tracing::{debug, info};

use crate::actions;
use crate::config::DashboardConfig;
use crate::status::StatusReader;

// Embed the dashboard page into the binary
static ASSETS: Dir<'_> = include_dir!("$CARGO_MANIFEST_DIR/static");

// App state shared by all handlers
#[derive(Clone)]
pub struct AppState {
    pub status: StatusReader,
    /// Present when the Prometheus recorder is installed
    pub metrics: Option<PrometheusHandle>,
}

fn static_response(path: &str, contents: &'static [u8]) -> Response {
    let content_type = from_path(path).first_or_octet_stream();
    let content_type = HeaderValue::from_str(content_type.as_ref())
        .unwrap_or(HeaderValue::from_static("application/octet-stream"));

    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, content_type),
            (header::CACHE_CONTROL, HeaderValue::from_static("no-cache")),
        ],
        contents,
    )
        .into_response()
}

async fn handle_static_file(uri: Uri) -> impl IntoResponse {
    let path = uri.path().trim_start_matches('/');
    let path = if path.is_empty() { "index.html" } else { path };

    if let Some(file) = ASSETS.get_file(path) {
        return static_response(path, file.contents());
    }

    // Unknown page paths get the dashboard
    if !path.contains('.')
        && let Some(index_file) = ASSETS.get_file("index.html")
    {
        return static_response("index.html", index_file.contents());
    }

    (StatusCode::NOT_FOUND, "Not Found").into_response()
}

// Middleware for request logging with correlation ID
async fn request_logging_middleware(request: Request<Body>, next: Next) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let request_id = Uuid::new_v4().to_string()[..8].to_string();
    let start_time = Instant::now();

    let response = next.run(request).await;
    let duration = start_time.elapsed();
    let status = response.status();

    metrics::counter!("dashboard.requests").increment(1);
    debug!(
        "{} {} [{}] {} in {:.2}ms",
        method,
        path,
        request_id,
        status.as_u16(),
        duration.as_secs_f64() * 1000.0
    );

    response
}

/// Dashboard routes over a status reader
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/status", get(actions::get_status))
        .route("/nearby", get(actions::get_nearby))
        .route("/metrics", get(actions::get_metrics))
        .fallback(handle_static_file)
        .with_state(state)
        .layer(middleware::from_fn(request_logging_middleware))
        .layer(CorsLayer::permissive())
}

/// Serve the dashboard until `cancel` fires
pub async fn start_web_server(
    config: &DashboardConfig,
    state: AppState,
    cancel: CancellationToken,
) -> Result<()> {
    sentry::configure_scope(|scope| {
        scope.set_tag("operation", "dashboard");
    });

    let addr = format!("{}:{}", config.interface, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind dashboard to {}", addr))?;
    info!("Dashboard listening on http://{}", addr);

    axum::serve(listener, build_router(state))
        .with_graceful_shutdown(async move { cancel.cancelled().await })
        .await
        .context("Dashboard server failed")?;

    info!("Dashboard stopped");
    Ok(())
}
