// Session HTTP routes
//
// A session stands in for one live messaging client. Registering a session
// makes its queue deliverable; removing it (logout) clears its queue.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{delete, get},
    Json, Router,
};
use herald_delivery::{SessionHandle, SessionInfo};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::common::{ErrorResponse, ListResponse};
use super::validation::validate_session_name;
use super::AppState;

/// Request to register (or re-register) a session
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RegisterSessionRequest {
    /// Session name; becomes part of the queue key
    #[schema(example = "ieguillermo")]
    pub name: String,
    /// Whether the session is logged in and may send (default true)
    #[serde(default = "default_authenticated")]
    pub authenticated: bool,
}

fn default_authenticated() -> bool {
    true
}

/// Create session routes
pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/v1/sessions", get(list_sessions).post(register_session))
        .route("/v1/sessions/:name", delete(remove_session))
        .with_state(state)
}

/// GET /v1/sessions - List registered sessions
#[utoipa::path(
    get,
    path = "/v1/sessions",
    responses(
        (status = 200, description = "Registered sessions", body = ListResponse<SessionInfo>)
    ),
    tag = "sessions"
)]
pub async fn list_sessions(State(state): State<AppState>) -> Json<ListResponse<SessionInfo>> {
    Json(ListResponse::new(state.registry.list()))
}

/// POST /v1/sessions - Register a session
#[utoipa::path(
    post,
    path = "/v1/sessions",
    request_body = RegisterSessionRequest,
    responses(
        (status = 201, description = "Session registered", body = SessionInfo),
        (status = 400, description = "Invalid session name", body = ErrorResponse)
    ),
    tag = "sessions"
)]
pub async fn register_session(
    State(state): State<AppState>,
    Json(req): Json<RegisterSessionRequest>,
) -> Result<(StatusCode, Json<SessionInfo>), (StatusCode, Json<ErrorResponse>)> {
    validate_session_name(&req.name).map_err(|e| e.into_response(StatusCode::BAD_REQUEST))?;

    state
        .registry
        .register(SessionHandle::new(&req.name).with_authenticated(req.authenticated));

    Ok((
        StatusCode::CREATED,
        Json(SessionInfo {
            name: req.name,
            authenticated: req.authenticated,
        }),
    ))
}

/// DELETE /v1/sessions/{name} - Log out a session and clear its queue
#[utoipa::path(
    delete,
    path = "/v1/sessions/{name}",
    params(
        ("name" = String, Path, description = "Session name")
    ),
    responses(
        (status = 204, description = "Session removed"),
        (status = 404, description = "Session not found"),
        (status = 500, description = "Internal server error")
    ),
    tag = "sessions"
)]
pub async fn remove_session(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<StatusCode, StatusCode> {
    state.registry.remove(&name).ok_or(StatusCode::NOT_FOUND)?;

    let removed = state.queue.clear_queue(&name).await.map_err(|e| {
        tracing::error!("Failed to clear queue of removed session: {}", e);
        StatusCode::INTERNAL_SERVER_ERROR
    })?;
    tracing::info!(session = %name, removed, "Session logged out");

    Ok(StatusCode::NO_CONTENT)
}
