//! Persistence layer for delivery queues
//!
//! This module provides:
//! - [`DeliveryStore`] trait for queue, archive and counter persistence
//! - [`InMemoryDeliveryStore`] for testing
//! - [`SqliteDeliveryStore`] for durable single-process deployments

mod memory;
mod sqlite;
mod store;

pub use memory::InMemoryDeliveryStore;
pub use sqlite::SqliteDeliveryStore;
pub use store::{DeliveryStore, StoreError};
