// Queue HTTP routes
//
// Operational view of live queues and their archives.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use herald_delivery::{QueueItem, QueueStatus};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::common::{LimitQuery, ListResponse};
use super::AppState;

/// Result of clearing a queue
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ClearQueueResponse {
    /// Number of live items removed
    pub removed: usize,
}

/// Create queue routes
pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/v1/queues", get(list_queues))
        .route("/v1/queues/:name", get(get_queue).delete(clear_queue))
        .route("/v1/queues/:name/errors", get(list_errors))
        .route("/v1/queues/:name/history", get(list_history))
        .with_state(state)
}

/// GET /v1/queues - Status of every non-empty queue
#[utoipa::path(
    get,
    path = "/v1/queues",
    responses(
        (status = 200, description = "Queue statuses", body = ListResponse<QueueStatus>),
        (status = 500, description = "Internal server error")
    ),
    tag = "queues"
)]
pub async fn list_queues(
    State(state): State<AppState>,
) -> Result<Json<ListResponse<QueueStatus>>, StatusCode> {
    let statuses = state.queue.get_all_statuses().await.map_err(|e| {
        tracing::error!("Failed to list queues: {}", e);
        StatusCode::INTERNAL_SERVER_ERROR
    })?;

    Ok(Json(ListResponse::new(statuses)))
}

/// GET /v1/queues/{name} - Queue status
#[utoipa::path(
    get,
    path = "/v1/queues/{name}",
    params(
        ("name" = String, Path, description = "Session name")
    ),
    responses(
        (status = 200, description = "Queue status", body = QueueStatus),
        (status = 500, description = "Internal server error")
    ),
    tag = "queues"
)]
pub async fn get_queue(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<QueueStatus>, StatusCode> {
    let status = state.queue.get_status(&name).await.map_err(|e| {
        tracing::error!("Failed to get queue status: {}", e);
        StatusCode::INTERNAL_SERVER_ERROR
    })?;

    Ok(Json(status))
}

/// DELETE /v1/queues/{name} - Drop all live items of a queue
#[utoipa::path(
    delete,
    path = "/v1/queues/{name}",
    params(
        ("name" = String, Path, description = "Session name")
    ),
    responses(
        (status = 200, description = "Queue cleared", body = ClearQueueResponse),
        (status = 500, description = "Internal server error")
    ),
    tag = "queues"
)]
pub async fn clear_queue(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<ClearQueueResponse>, StatusCode> {
    let removed = state.queue.clear_queue(&name).await.map_err(|e| {
        tracing::error!("Failed to clear queue: {}", e);
        StatusCode::INTERNAL_SERVER_ERROR
    })?;

    Ok(Json(ClearQueueResponse { removed }))
}

/// GET /v1/queues/{name}/errors - Recently failed items, newest first
#[utoipa::path(
    get,
    path = "/v1/queues/{name}/errors",
    params(
        ("name" = String, Path, description = "Session name"),
        LimitQuery
    ),
    responses(
        (status = 200, description = "Failed items", body = ListResponse<QueueItem>),
        (status = 500, description = "Internal server error")
    ),
    tag = "queues"
)]
pub async fn list_errors(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Query(query): Query<LimitQuery>,
) -> Result<Json<ListResponse<QueueItem>>, StatusCode> {
    let items = state
        .queue
        .list_errors(&name, query.resolve())
        .await
        .map_err(|e| {
            tracing::error!("Failed to list errors: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR
        })?;

    Ok(Json(ListResponse::new(items)))
}

/// GET /v1/queues/{name}/history - Recently delivered items, newest first
#[utoipa::path(
    get,
    path = "/v1/queues/{name}/history",
    params(
        ("name" = String, Path, description = "Session name"),
        LimitQuery
    ),
    responses(
        (status = 200, description = "Delivered items", body = ListResponse<QueueItem>),
        (status = 500, description = "Internal server error")
    ),
    tag = "queues"
)]
pub async fn list_history(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Query(query): Query<LimitQuery>,
) -> Result<Json<ListResponse<QueueItem>>, StatusCode> {
    let items = state
        .queue
        .list_history(&name, query.resolve())
        .await
        .map_err(|e| {
            tracing::error!("Failed to list history: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR
        })?;

    Ok(Json(ListResponse::new(items)))
}
