// HTTP API routes
//
// This module contains all HTTP route handlers for the public API.
// Every resource module shares the same AppState.

pub mod common;
pub mod debug;
pub mod messages;
pub mod queues;
pub mod sessions;
pub mod stats;
pub mod validation;

use std::sync::Arc;

use herald_delivery::{DeliveryQueue, InMemorySessionRegistry};

// Re-export common types
pub use common::{ErrorResponse, ListResponse};

/// App state shared by all routes
#[derive(Clone)]
pub struct AppState {
    pub queue: Arc<DeliveryQueue>,
    pub registry: Arc<InMemorySessionRegistry>,
}

impl AppState {
    pub fn new(queue: Arc<DeliveryQueue>, registry: Arc<InMemorySessionRegistry>) -> Self {
        Self { queue, registry }
    }
}
