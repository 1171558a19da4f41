// OpenAPI specification generation
//
// Served by the API at /api-doc/openapi.json and exported as a static file
// by the export-openapi binary.

use crate::api;
use crate::api::{ErrorResponse, ListResponse};
use herald_delivery::{DailyCount, ItemStatus, QueueItem, QueueStatus, SessionInfo, SessionStats};
use utoipa::OpenApi;

/// OpenAPI documentation for the Herald API
#[derive(OpenApi)]
#[openapi(
    paths(
        api::sessions::list_sessions,
        api::sessions::register_session,
        api::sessions::remove_session,
        api::messages::send_message,
        api::queues::list_queues,
        api::queues::get_queue,
        api::queues::clear_queue,
        api::queues::list_errors,
        api::queues::list_history,
        api::stats::list_stats,
        api::stats::get_stats,
        api::stats::reset_stats,
        api::debug::process_queue,
    ),
    components(
        schemas(
            SessionInfo, QueueItem, ItemStatus, QueueStatus, SessionStats, DailyCount,
            api::sessions::RegisterSessionRequest,
            api::messages::SendMessageRequest, api::messages::EnqueueResponse,
            api::queues::ClearQueueResponse,
            ErrorResponse,
            ListResponse<SessionInfo>,
            ListResponse<QueueStatus>,
            ListResponse<QueueItem>,
            ListResponse<SessionStats>,
        )
    ),
    tags(
        (name = "sessions", description = "Session registration endpoints"),
        (name = "messages", description = "Message submission endpoints"),
        (name = "queues", description = "Queue inspection and archive endpoints"),
        (name = "stats", description = "Daily delivery statistics"),
        (name = "debug", description = "Manual scheduler control")
    ),
    info(
        title = "Herald API",
        version = "0.1.0",
        description = "API for queueing and tracking per-session notification delivery"
    )
)]
pub struct ApiDoc;

impl ApiDoc {
    /// Generate the OpenAPI spec as a pretty-printed JSON string
    pub fn to_json() -> Result<String, serde_json::Error> {
        Self::openapi().to_pretty_json()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spec_lists_all_paths() {
        let spec = ApiDoc::openapi();
        let paths: Vec<&str> = spec.paths.paths.keys().map(|p| p.as_str()).collect();

        for expected in [
            "/v1/sessions",
            "/v1/sessions/{name}",
            "/v1/sessions/{name}/messages",
            "/v1/queues",
            "/v1/queues/{name}",
            "/v1/queues/{name}/errors",
            "/v1/queues/{name}/history",
            "/v1/stats",
            "/v1/stats/{name}",
            "/v1/debug/process-queue",
        ] {
            assert!(paths.contains(&expected), "missing path {}", expected);
        }
    }

    #[test]
    fn test_spec_serializes() {
        let json = ApiDoc::to_json().unwrap();
        assert!(json.contains("Herald API"));
    }
}
