// Herald server library
// Decision: Router assembly lives here so binaries and tests share it

// API routes and types (shared for OpenAPI generation)
pub mod api;

// Environment configuration
pub mod config;

// OpenAPI spec generation
pub mod openapi;

use axum::{routing::get, Json, Router};
use serde::Serialize;
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;

pub use api::AppState;
pub use config::ServerConfig;

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(openapi::ApiDoc::openapi())
}

/// Build the complete HTTP application
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api-doc/openapi.json", get(openapi_json))
        .merge(api::sessions::routes(state.clone()))
        .merge(api::messages::routes(state.clone()))
        .merge(api::queues::routes(state.clone()))
        .merge(api::stats::routes(state.clone()))
        .merge(api::debug::routes(state))
        .layer(TraceLayer::new_for_http())
}
