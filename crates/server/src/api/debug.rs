// Debug HTTP routes
//
// Manual scheduler control for operators and local testing.

use axum::{extract::State, routing::post, Json, Router};
use herald_delivery::TickReport;

use super::AppState;

/// Create debug routes
pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/v1/debug/process-queue", post(process_queue))
        .with_state(state)
}

/// POST /v1/debug/process-queue - Run one scheduling pass now
///
/// Returns `skipped: true` when a pass is already running.
#[utoipa::path(
    post,
    path = "/v1/debug/process-queue",
    responses(
        (status = 200, description = "Per-session outcome of the pass")
    ),
    tag = "debug"
)]
pub async fn process_queue(State(state): State<AppState>) -> Json<TickReport> {
    let report = state.queue.force_tick().await;
    tracing::info!(
        skipped = report.skipped,
        sessions = report.sessions.len(),
        delivered = report.delivered(),
        "Forced queue pass"
    );
    Json(report)
}
