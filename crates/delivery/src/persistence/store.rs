//! DeliveryStore trait definition

use std::time::Duration;

use async_trait::async_trait;

/// Error type for store operations
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Database error
    #[error("database error: {0}")]
    Database(String),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        StoreError::Database(e.to_string())
    }
}

/// Durable storage for delivery queues, archives and counters
///
/// Queue entries and archive records are opaque JSON strings; decoding
/// (and discarding of corrupt entries) happens in the scheduler.
///
/// Keys follow a flat namespace:
/// - `queue:{session}` - ordered list of pending work
/// - `history:{session}:{id}` / `errors:{session}:{id}` - TTL-bounded records
/// - `stats:daily:{session}:{date}` - TTL-bounded counters
#[async_trait]
pub trait DeliveryStore: Send + Sync {
    // =========================================================================
    // Queue operations
    // =========================================================================

    /// Append an entry to the tail of a queue
    async fn push(&self, key: &str, payload: &str) -> Result<(), StoreError>;

    /// Read the head entry without removing it
    async fn peek_head(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Remove and return the head entry
    async fn pop_head(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Replace the head entry in place
    ///
    /// Returns `false` if the queue is empty.
    async fn update_head(&self, key: &str, payload: &str) -> Result<bool, StoreError>;

    /// Number of entries in a queue
    async fn len(&self, key: &str) -> Result<usize, StoreError>;

    /// All entries of a queue, head first
    async fn items(&self, key: &str) -> Result<Vec<String>, StoreError>;

    /// Keys of all non-empty queues starting with `prefix`
    async fn list_queue_keys(&self, prefix: &str) -> Result<Vec<String>, StoreError>;

    /// Delete a whole queue, returning the number of entries removed
    async fn delete_queue(&self, key: &str) -> Result<usize, StoreError>;

    // =========================================================================
    // Archive records
    // =========================================================================

    /// Write a record that expires after `ttl`
    ///
    /// Writing an existing key replaces it and resets its expiry.
    async fn put_record(&self, key: &str, payload: &str, ttl: Duration)
        -> Result<(), StoreError>;

    /// List unexpired records whose key starts with `prefix`, newest first
    async fn list_records(&self, prefix: &str, limit: usize) -> Result<Vec<String>, StoreError>;

    /// Drop expired records and counters, returning how many rows were removed
    async fn purge_expired(&self) -> Result<u64, StoreError>;

    // =========================================================================
    // Counters
    // =========================================================================

    /// Increment a counter and (re)arm its expiry, returning the new value
    async fn incr_counter(&self, key: &str, ttl: Duration) -> Result<i64, StoreError>;

    /// Current counter value (0 if absent or expired)
    async fn get_counter(&self, key: &str) -> Result<i64, StoreError>;

    /// Delete a counter, returning whether it existed
    async fn delete_counter(&self, key: &str) -> Result<bool, StoreError>;

    /// Keys of all unexpired counters starting with `prefix`
    async fn list_counter_keys(&self, prefix: &str) -> Result<Vec<String>, StoreError>;
}
