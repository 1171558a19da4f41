// HTTP API tests
// Run with: cargo test -p herald-server --test api_test
// Drives the router in-process over the in-memory store; no server or database needed.

use std::sync::Arc;

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use herald_delivery::{
    DeliveryConfig, DeliveryQueue, DryRunConfig, DryRunTransport, ErrorKind,
    InMemoryDeliveryStore, InMemorySessionRegistry, SessionHandle,
};
use herald_server::{router, AppState};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

struct TestApp {
    app: Router,
    transport: Arc<DryRunTransport>,
}

fn test_app() -> TestApp {
    let store = Arc::new(InMemoryDeliveryStore::new());
    let registry = Arc::new(InMemorySessionRegistry::new());
    registry.register(SessionHandle::new("ieguillermo").with_authenticated(true));

    let transport = Arc::new(DryRunTransport::new(
        DryRunConfig::default().with_failure("51900000000", ErrorKind::NoSuchRecipient),
    ));
    let queue = Arc::new(DeliveryQueue::new(
        store,
        registry.clone(),
        transport.clone(),
        DeliveryConfig::default(),
    ));

    TestApp {
        app: router(AppState::new(queue, registry)),
        transport,
    }
}

async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let request = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => request
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => request.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

// =============================================================================
// Health and docs
// =============================================================================

#[tokio::test]
async fn test_health() {
    let t = test_app();
    let (status, body) = send(&t.app, "GET", "/health", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn test_openapi_document() {
    let t = test_app();
    let (status, body) = send(&t.app, "GET", "/api-doc/openapi.json", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["info"]["title"], "Herald API");
    assert!(body["paths"]["/v1/sessions/{name}/messages"].is_object());
}

// =============================================================================
// Sessions
// =============================================================================

#[tokio::test]
async fn test_register_and_list_sessions() {
    let t = test_app();

    let (status, body) = send(
        &t.app,
        "POST",
        "/v1/sessions",
        Some(json!({ "name": "secundaria" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["authenticated"], true);

    let (status, body) = send(&t.app, "GET", "/v1/sessions", None).await;
    assert_eq!(status, StatusCode::OK);
    let names: Vec<&str> = body["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|s| s["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["ieguillermo", "secundaria"]);
}

#[tokio::test]
async fn test_register_rejects_bad_name() {
    let t = test_app();
    let (status, body) = send(
        &t.app,
        "POST",
        "/v1/sessions",
        Some(json!({ "name": "a:b" })),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("':'"));
}

#[tokio::test]
async fn test_logout_clears_queue() {
    let t = test_app();
    send(
        &t.app,
        "POST",
        "/v1/sessions/ieguillermo/messages",
        Some(json!({ "phone_number": "987654321", "message": "hi" })),
    )
    .await;

    let (status, _) = send(&t.app, "DELETE", "/v1/sessions/ieguillermo", None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (_, body) = send(&t.app, "GET", "/v1/queues/ieguillermo", None).await;
    assert_eq!(body["total"], 0);

    let (status, _) = send(&t.app, "DELETE", "/v1/sessions/ieguillermo", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

// =============================================================================
// Messages
// =============================================================================

#[tokio::test]
async fn test_send_message_is_accepted() {
    let t = test_app();
    let (status, body) = send(
        &t.app,
        "POST",
        "/v1/sessions/ieguillermo/messages",
        Some(json!({ "phone_number": "987654321", "message": "Attendance: present" })),
    )
    .await;

    assert_eq!(status, StatusCode::ACCEPTED);
    assert!(body["queue_id"]
        .as_str()
        .unwrap()
        .starts_with("ieguillermo-"));

    let (_, body) = send(&t.app, "GET", "/v1/queues/ieguillermo", None).await;
    assert_eq!(body["sessionName"], "ieguillermo");
    assert_eq!(body["pending"], 1);
    assert_eq!(body["estimatedWaitSeconds"], 8);
}

#[tokio::test]
async fn test_send_message_to_unknown_session() {
    let t = test_app();
    let (status, body) = send(
        &t.app,
        "POST",
        "/v1/sessions/nobody/messages",
        Some(json!({ "phone_number": "987654321", "message": "hi" })),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("does not exist"));
}

#[tokio::test]
async fn test_send_message_to_unauthenticated_session() {
    let t = test_app();
    send(
        &t.app,
        "POST",
        "/v1/sessions",
        Some(json!({ "name": "pending-login", "authenticated": false })),
    )
    .await;

    let (status, body) = send(
        &t.app,
        "POST",
        "/v1/sessions/pending-login/messages",
        Some(json!({ "phone_number": "987654321", "message": "hi" })),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"]
        .as_str()
        .unwrap()
        .contains("not authenticated"));
}

#[tokio::test]
async fn test_send_message_validates_input() {
    let t = test_app();
    let (status, _) = send(
        &t.app,
        "POST",
        "/v1/sessions/ieguillermo/messages",
        Some(json!({ "phone_number": "", "message": "hi" })),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
}

// =============================================================================
// Processing, archives and stats
// =============================================================================

#[tokio::test]
async fn test_forced_pass_delivers_and_updates_stats() {
    let t = test_app();
    send(
        &t.app,
        "POST",
        "/v1/sessions/ieguillermo/messages",
        Some(json!({ "phone_number": "987654321", "message": "hi" })),
    )
    .await;

    let (status, body) = send(&t.app, "POST", "/v1/debug/process-queue", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["skipped"], false);
    assert_eq!(body["sessions"][0]["session"], "ieguillermo");
    assert_eq!(body["sessions"][0]["outcome"], "delivered");
    assert_eq!(t.transport.sent_count(), 1);

    let (_, body) = send(&t.app, "GET", "/v1/queues/ieguillermo/history", None).await;
    assert_eq!(body["data"].as_array().unwrap().len(), 1);
    assert_eq!(body["data"][0]["status"], "completed");

    let (_, body) = send(&t.app, "GET", "/v1/stats/ieguillermo", None).await;
    assert_eq!(body["today"]["count"], 1);
    assert_eq!(body["last7Days"].as_array().unwrap().len(), 7);

    let (_, body) = send(&t.app, "GET", "/v1/stats", None).await;
    assert_eq!(body["data"].as_array().unwrap().len(), 1);

    let (status, _) = send(&t.app, "DELETE", "/v1/stats/ieguillermo", None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (_, body) = send(&t.app, "GET", "/v1/stats/ieguillermo", None).await;
    assert_eq!(body["today"]["count"], 0);
}

#[tokio::test]
async fn test_failed_delivery_shows_in_errors() {
    let t = test_app();
    send(
        &t.app,
        "POST",
        "/v1/sessions/ieguillermo/messages",
        Some(json!({ "phone_number": "900000000", "message": "hi" })),
    )
    .await;
    send(&t.app, "POST", "/v1/debug/process-queue", None).await;

    let (status, body) = send(
        &t.app,
        "GET",
        "/v1/queues/ieguillermo/errors?limit=5",
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let errors = body["data"].as_array().unwrap();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0]["status"], "failed");
    assert_eq!(errors[0]["retryCount"], 0);
}

#[tokio::test]
async fn test_list_and_clear_queues() {
    let t = test_app();
    for n in ["987654321", "912345678"] {
        send(
            &t.app,
            "POST",
            "/v1/sessions/ieguillermo/messages",
            Some(json!({ "phone_number": n, "message": "hi" })),
        )
        .await;
    }

    let (_, body) = send(&t.app, "GET", "/v1/queues", None).await;
    assert_eq!(body["data"].as_array().unwrap().len(), 1);
    assert_eq!(body["data"][0]["total"], 2);

    let (status, body) = send(&t.app, "DELETE", "/v1/queues/ieguillermo", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["removed"], 2);

    let (_, body) = send(&t.app, "GET", "/v1/queues", None).await;
    assert!(body["data"].as_array().unwrap().is_empty());
}
