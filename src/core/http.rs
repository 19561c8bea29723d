//! HTTP surface of the worker: health, metrics and the last pass summary

use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::{Json, Response},
    routing::get,
    Router,
};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::RwLock;
use tower::ServiceBuilder;
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::{error, info, Level};

use crate::metrics::Metrics;
use crate::models::outcome::PassSummary;

#[derive(Clone)]
pub struct AppState {
    pub metrics: Arc<Metrics>,
    pub started: Instant,
    pub last_pass: Arc<RwLock<Option<PassSummary>>>,
}

impl AppState {
    pub fn new(metrics: Arc<Metrics>, last_pass: Arc<RwLock<Option<PassSummary>>>) -> Self {
        Self {
            metrics,
            started: Instant::now(),
            last_pass,
        }
    }
}

/// Liveness plus the time the last pass finished
pub async fn health_check(State(state): State<AppState>) -> Json<Value> {
    let last_pass_at = state.last_pass.read().await.as_ref().map(|s| s.finished_at);
    Json(json!({
        "status": "healthy",
        "service": "tripwire-monitor",
        "uptime_seconds": state.started.elapsed().as_secs(),
        "last_pass_at": last_pass_at,
    }))
}

pub async fn metrics_handler(State(state): State<AppState>) -> Result<String, StatusCode> {
    state.metrics.export().map_err(|e| {
        error!(error = %e, "Failed to encode metrics");
        StatusCode::INTERNAL_SERVER_ERROR
    })
}

/// Summary of the most recent pass, `null` before the first one finishes
pub async fn status_handler(State(state): State<AppState>) -> Json<Value> {
    let last_pass = state.last_pass.read().await;
    Json(json!({ "last_pass": *last_pass }))
}

async fn track_requests(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let metrics = state.metrics;
    let path = request.uri().path().to_string();
    let timer = metrics.http_request_duration_seconds.start_timer();

    metrics.http_requests_in_flight.inc();
    let response = next.run(request).await;
    metrics.http_requests_in_flight.dec();
    metrics.http_requests_total.inc();
    timer.observe_duration();

    if response.status().is_server_error() {
        error!(path = %path, status = %response.status(), "Request failed");
    }
    response
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/metrics", get(metrics_handler))
        .route("/status", get(status_handler))
        .layer(
            ServiceBuilder::new()
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(DefaultMakeSpan::new().level(Level::DEBUG))
                        .on_request(DefaultOnRequest::new().level(Level::DEBUG))
                        .on_response(DefaultOnResponse::new().level(Level::DEBUG)),
                )
                .layer(axum::middleware::from_fn_with_state(state.clone(), track_requests))
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}

pub async fn start_server(port: u16, state: AppState) -> Result<(), std::io::Error> {
    let listener = tokio::net::TcpListener::bind(("0.0.0.0", port)).await?;
    let app = create_router(state);

    info!(port = port, "Serving /health, /metrics and /status");
    axum::serve(listener, app).await
}
