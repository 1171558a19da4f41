// Delivery stats HTTP routes

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use herald_delivery::SessionStats;

use super::common::ListResponse;
use super::AppState;

/// Create stats routes
pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/v1/stats", get(list_stats))
        .route("/v1/stats/:name", get(get_stats).delete(reset_stats))
        .with_state(state)
}

/// GET /v1/stats - Stats for every session with deliveries in the retention window
#[utoipa::path(
    get,
    path = "/v1/stats",
    responses(
        (status = 200, description = "Per-session stats", body = ListResponse<SessionStats>),
        (status = 500, description = "Internal server error")
    ),
    tag = "stats"
)]
pub async fn list_stats(
    State(state): State<AppState>,
) -> Result<Json<ListResponse<SessionStats>>, StatusCode> {
    let stats = state.queue.all_session_stats().await.map_err(|e| {
        tracing::error!("Failed to load stats: {}", e);
        StatusCode::INTERNAL_SERVER_ERROR
    })?;

    Ok(Json(ListResponse::new(stats)))
}

/// GET /v1/stats/{name} - Today and the last seven days for one session
#[utoipa::path(
    get,
    path = "/v1/stats/{name}",
    params(
        ("name" = String, Path, description = "Session name")
    ),
    responses(
        (status = 200, description = "Session stats", body = SessionStats),
        (status = 500, description = "Internal server error")
    ),
    tag = "stats"
)]
pub async fn get_stats(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<SessionStats>, StatusCode> {
    let stats = state.queue.session_stats(&name).await.map_err(|e| {
        tracing::error!("Failed to load session stats: {}", e);
        StatusCode::INTERNAL_SERVER_ERROR
    })?;

    Ok(Json(stats))
}

/// DELETE /v1/stats/{name} - Reset today's counter
#[utoipa::path(
    delete,
    path = "/v1/stats/{name}",
    params(
        ("name" = String, Path, description = "Session name")
    ),
    responses(
        (status = 204, description = "Counter reset"),
        (status = 500, description = "Internal server error")
    ),
    tag = "stats"
)]
pub async fn reset_stats(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<StatusCode, StatusCode> {
    state.queue.reset_daily_stats(&name).await.map_err(|e| {
        tracing::error!("Failed to reset stats: {}", e);
        StatusCode::INTERNAL_SERVER_ERROR
    })?;

    Ok(StatusCode::NO_CONTENT)
}
