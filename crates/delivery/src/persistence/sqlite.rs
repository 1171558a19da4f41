//! SQLite implementation of DeliveryStore
//!
//! Durable persistence using SQLite with:
//! - An autoincrement sequence per entry for strict queue ordering
//! - Expiry timestamps on archive records and counters
//! - Schema bootstrap on open

use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Row, SqlitePool};
use tracing::{debug, error, info, instrument};

use super::store::*;

const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS delivery_queue_items (
        seq INTEGER PRIMARY KEY AUTOINCREMENT,
        queue_key TEXT NOT NULL,
        payload TEXT NOT NULL
    )
    "#,
    r#"
    CREATE INDEX IF NOT EXISTS idx_delivery_queue_items_key
        ON delivery_queue_items (queue_key, seq)
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS delivery_records (
        seq INTEGER PRIMARY KEY AUTOINCREMENT,
        key TEXT NOT NULL UNIQUE,
        payload TEXT NOT NULL,
        expires_at INTEGER NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS delivery_counters (
        key TEXT PRIMARY KEY,
        value INTEGER NOT NULL,
        expires_at INTEGER NOT NULL
    )
    "#,
];

/// SQLite implementation of DeliveryStore
///
/// # Example
///
/// ```ignore
/// use herald_delivery::SqliteDeliveryStore;
///
/// let store = SqliteDeliveryStore::connect("sqlite://herald.db?mode=rwc", 5).await?;
/// ```
#[derive(Clone)]
pub struct SqliteDeliveryStore {
    pool: SqlitePool,
}

impl SqliteDeliveryStore {
    /// Create a store over an existing pool and make sure the schema exists
    pub async fn new(pool: SqlitePool) -> Result<Self, StoreError> {
        let store = Self { pool };
        store.migrate().await?;
        Ok(store)
    }

    /// Open (creating if needed) the database at `url`
    #[instrument]
    pub async fn connect(url: &str, max_connections: u32) -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::from_str(url)
            .map_err(|e| {
                error!("Invalid database url: {}", e);
                StoreError::Database(e.to_string())
            })?
            .create_if_missing(true)
            .busy_timeout(Duration::from_secs(5));

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections.max(1))
            .connect_with(options)
            .await
            .map_err(|e| {
                error!("Failed to open database: {}", e);
                StoreError::Database(e.to_string())
            })?;

        info!(max_connections, "Opened SQLite delivery store");
        Self::new(pool).await
    }

    /// Open a private in-memory database
    ///
    /// A single, never-recycled connection keeps every query on the same
    /// database.
    pub async fn in_memory() -> Result<Self, StoreError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect("sqlite::memory:")
            .await?;
        Self::new(pool).await
    }

    /// Get a reference to the connection pool
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    async fn migrate(&self) -> Result<(), StoreError> {
        for statement in SCHEMA {
            sqlx::query(*statement)
                .execute(&self.pool)
                .await
                .map_err(|e| {
                    error!("Failed to apply schema: {}", e);
                    StoreError::Database(e.to_string())
                })?;
        }
        Ok(())
    }
}

/// Expiry instant as unix milliseconds
fn expiry(ttl: Duration) -> Result<i64, StoreError> {
    let ttl = chrono::Duration::from_std(ttl)
        .map_err(|e| StoreError::Database(format!("invalid ttl: {}", e)))?;
    Ok((Utc::now() + ttl).timestamp_millis())
}

fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

#[async_trait]
impl DeliveryStore for SqliteDeliveryStore {
    #[instrument(skip(self, payload))]
    async fn push(&self, key: &str, payload: &str) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO delivery_queue_items (queue_key, payload)
            VALUES (?1, ?2)
            "#,
        )
        .bind(key)
        .bind(payload)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            error!("Failed to push queue item: {}", e);
            StoreError::Database(e.to_string())
        })?;

        debug!(%key, "pushed queue item");
        Ok(())
    }

    #[instrument(skip(self))]
    async fn peek_head(&self, key: &str) -> Result<Option<String>, StoreError> {
        let row = sqlx::query(
            r#"
            SELECT payload FROM delivery_queue_items
            WHERE queue_key = ?1
            ORDER BY seq ASC
            LIMIT 1
            "#,
        )
        .bind(key)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            error!("Failed to peek queue head: {}", e);
            StoreError::Database(e.to_string())
        })?;

        Ok(row.map(|r| r.get("payload")))
    }

    #[instrument(skip(self))]
    async fn pop_head(&self, key: &str) -> Result<Option<String>, StoreError> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query(
            r#"
            SELECT seq, payload FROM delivery_queue_items
            WHERE queue_key = ?1
            ORDER BY seq ASC
            LIMIT 1
            "#,
        )
        .bind(key)
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| {
            error!("Failed to read queue head: {}", e);
            StoreError::Database(e.to_string())
        })?;

        let Some(row) = row else {
            tx.commit().await?;
            return Ok(None);
        };

        let seq: i64 = row.get("seq");
        let payload: String = row.get("payload");

        sqlx::query("DELETE FROM delivery_queue_items WHERE seq = ?1")
            .bind(seq)
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                error!("Failed to pop queue head: {}", e);
                StoreError::Database(e.to_string())
            })?;

        tx.commit().await?;
        Ok(Some(payload))
    }

    #[instrument(skip(self, payload))]
    async fn update_head(&self, key: &str, payload: &str) -> Result<bool, StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE delivery_queue_items
            SET payload = ?2
            WHERE seq = (
                SELECT MIN(seq) FROM delivery_queue_items WHERE queue_key = ?1
            )
            "#,
        )
        .bind(key)
        .bind(payload)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            error!("Failed to update queue head: {}", e);
            StoreError::Database(e.to_string())
        })?;

        Ok(result.rows_affected() > 0)
    }

    async fn len(&self, key: &str) -> Result<usize, StoreError> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM delivery_queue_items WHERE queue_key = ?1")
                .bind(key)
                .fetch_one(&self.pool)
                .await?;
        Ok(count as usize)
    }

    async fn items(&self, key: &str) -> Result<Vec<String>, StoreError> {
        let rows: Vec<String> = sqlx::query_scalar(
            r#"
            SELECT payload FROM delivery_queue_items
            WHERE queue_key = ?1
            ORDER BY seq ASC
            "#,
        )
        .bind(key)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn list_queue_keys(&self, prefix: &str) -> Result<Vec<String>, StoreError> {
        // substr comparison avoids LIKE wildcards inside session names
        let keys: Vec<String> = sqlx::query_scalar(
            r#"
            SELECT DISTINCT queue_key FROM delivery_queue_items
            WHERE substr(queue_key, 1, length(?1)) = ?1
            ORDER BY queue_key
            "#,
        )
        .bind(prefix)
        .fetch_all(&self.pool)
        .await?;
        Ok(keys)
    }

    #[instrument(skip(self))]
    async fn delete_queue(&self, key: &str) -> Result<usize, StoreError> {
        let result = sqlx::query("DELETE FROM delivery_queue_items WHERE queue_key = ?1")
            .bind(key)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                error!("Failed to delete queue: {}", e);
                StoreError::Database(e.to_string())
            })?;
        Ok(result.rows_affected() as usize)
    }

    #[instrument(skip(self, payload))]
    async fn put_record(
        &self,
        key: &str,
        payload: &str,
        ttl: Duration,
    ) -> Result<(), StoreError> {
        let expires_at = expiry(ttl)?;

        // REPLACE assigns a fresh seq, so a rewritten record lists as newest
        sqlx::query(
            r#"
            INSERT OR REPLACE INTO delivery_records (key, payload, expires_at)
            VALUES (?1, ?2, ?3)
            "#,
        )
        .bind(key)
        .bind(payload)
        .bind(expires_at)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            error!("Failed to write record: {}", e);
            StoreError::Database(e.to_string())
        })?;

        Ok(())
    }

    async fn list_records(&self, prefix: &str, limit: usize) -> Result<Vec<String>, StoreError> {
        let rows: Vec<String> = sqlx::query_scalar(
            r#"
            SELECT payload FROM delivery_records
            WHERE substr(key, 1, length(?1)) = ?1
              AND expires_at > ?2
            ORDER BY seq DESC
            LIMIT ?3
            "#,
        )
        .bind(prefix)
        .bind(now_millis())
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    #[instrument(skip(self))]
    async fn purge_expired(&self) -> Result<u64, StoreError> {
        let now = now_millis();

        let records = sqlx::query("DELETE FROM delivery_records WHERE expires_at <= ?1")
            .bind(now)
            .execute(&self.pool)
            .await?;
        let counters = sqlx::query("DELETE FROM delivery_counters WHERE expires_at <= ?1")
            .bind(now)
            .execute(&self.pool)
            .await?;

        Ok(records.rows_affected() + counters.rows_affected())
    }

    #[instrument(skip(self))]
    async fn incr_counter(&self, key: &str, ttl: Duration) -> Result<i64, StoreError> {
        let now = now_millis();
        let expires_at = expiry(ttl)?;

        let value: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO delivery_counters (key, value, expires_at)
            VALUES (?1, 1, ?3)
            ON CONFLICT (key) DO UPDATE SET
                value = CASE
                    WHEN delivery_counters.expires_at <= ?2 THEN 1
                    ELSE delivery_counters.value + 1
                END,
                expires_at = excluded.expires_at
            RETURNING value
            "#,
        )
        .bind(key)
        .bind(now)
        .bind(expires_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            error!("Failed to increment counter: {}", e);
            StoreError::Database(e.to_string())
        })?;

        Ok(value)
    }

    async fn get_counter(&self, key: &str) -> Result<i64, StoreError> {
        let value: Option<i64> = sqlx::query_scalar(
            "SELECT value FROM delivery_counters WHERE key = ?1 AND expires_at > ?2",
        )
        .bind(key)
        .bind(now_millis())
        .fetch_optional(&self.pool)
        .await?;
        Ok(value.unwrap_or(0))
    }

    async fn delete_counter(&self, key: &str) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM delivery_counters WHERE key = ?1")
            .bind(key)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_counter_keys(&self, prefix: &str) -> Result<Vec<String>, StoreError> {
        let keys: Vec<String> = sqlx::query_scalar(
            r#"
            SELECT key FROM delivery_counters
            WHERE substr(key, 1, length(?1)) = ?1
              AND expires_at > ?2
            ORDER BY key
            "#,
        )
        .bind(prefix)
        .bind(now_millis())
        .fetch_all(&self.pool)
        .await?;
        Ok(keys)
    }
}
