use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;

use depot_service::MetricsSnapshot;

use super::AppState;
use super::schemas::HealthResponse;

/// `GET /health` -- returns service status together with a metrics snapshot.
#[utoipa::path(
    get,
    path = "/health",
    tag = "Health",
    summary = "Health check",
    description = "Returns service status and a snapshot of upload, download and deletion counters.",
    responses(
        (status = 200, description = "Service is healthy", body = HealthResponse)
    )
)]
pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let body = HealthResponse {
        status: "ok".into(),
        metrics: state.files.metrics().snapshot(),
    };

    (StatusCode::OK, Json(body))
}

/// `GET /metrics` -- returns service metrics as JSON.
#[utoipa::path(
    get,
    path = "/metrics",
    tag = "Health",
    summary = "Service metrics",
    description = "Returns current file service counters for monitoring.",
    responses(
        (status = 200, description = "Current metric counters", body = MetricsSnapshot)
    )
)]
pub async fn metrics(State(state): State<AppState>) -> impl IntoResponse {
    (StatusCode::OK, Json(state.files.metrics().snapshot()))
}
