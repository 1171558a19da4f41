// Message HTTP routes
//
// Producer entry point: accepted messages are queued for asynchronous
// delivery, so the response is 202 with the queue item id.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::post,
    Json, Router,
};
use herald_delivery::{DeliveryError, SessionRegistry};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::common::ErrorResponse;
use super::validation::validate_message;
use super::AppState;

/// Request to send a message through a session
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SendMessageRequest {
    /// Destination number; local numbers get the country code at send time
    #[schema(example = "987654321")]
    pub phone_number: String,
    /// Fully rendered message text
    pub message: String,
}

/// Accepted message
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct EnqueueResponse {
    /// Id of the queued item
    pub queue_id: String,
}

/// Create message routes (nested under sessions)
pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/v1/sessions/:name/messages", post(send_message))
        .with_state(state)
}

/// POST /v1/sessions/{name}/messages - Queue a message for delivery
#[utoipa::path(
    post,
    path = "/v1/sessions/{name}/messages",
    params(
        ("name" = String, Path, description = "Session name")
    ),
    request_body = SendMessageRequest,
    responses(
        (status = 202, description = "Message queued", body = EnqueueResponse),
        (status = 400, description = "Unknown or unauthenticated session, or invalid input", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tag = "messages"
)]
pub async fn send_message(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Json(req): Json<SendMessageRequest>,
) -> Result<(StatusCode, Json<EnqueueResponse>), (StatusCode, Json<ErrorResponse>)> {
    validate_message(&req.phone_number, &req.message)
        .map_err(|e| e.into_response(StatusCode::BAD_REQUEST))?;

    let session = state.registry.lookup(&name).ok_or_else(|| {
        ErrorResponse::new(format!("session '{}' does not exist", name))
            .into_response(StatusCode::BAD_REQUEST)
    })?;
    if !session.is_ready() {
        return Err(
            ErrorResponse::new(format!("session '{}' is not authenticated", name))
                .into_response(StatusCode::BAD_REQUEST),
        );
    }

    let queue_id = state
        .queue
        .enqueue(&name, &req.phone_number, &req.message)
        .await
        .map_err(|e| match e {
            DeliveryError::InvalidSession(reason) => {
                ErrorResponse::new(reason.to_string()).into_response(StatusCode::BAD_REQUEST)
            }
            e => {
                tracing::error!("Failed to enqueue message: {}", e);
                ErrorResponse::new("failed to queue message")
                    .into_response(StatusCode::INTERNAL_SERVER_ERROR)
            }
        })?;

    Ok((StatusCode::ACCEPTED, Json(EnqueueResponse { queue_id })))
}
