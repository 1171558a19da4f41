//! In-memory implementation of DeliveryStore for testing

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;

use super::store::*;

/// Archive record with expiry
struct RecordEntry {
    payload: String,
    expires_at: DateTime<Utc>,
    /// Insertion order, used for newest-first listing
    seq: u64,
}

/// Counter with expiry
struct CounterEntry {
    value: i64,
    expires_at: DateTime<Utc>,
}

/// In-memory implementation of DeliveryStore
///
/// This is primarily for testing. It stores all data in memory and
/// provides the same semantics as the SQLite implementation.
///
/// # Example
///
/// ```
/// use herald_delivery::InMemoryDeliveryStore;
///
/// let store = InMemoryDeliveryStore::new();
/// assert_eq!(store.record_count(), 0);
/// ```
pub struct InMemoryDeliveryStore {
    queues: RwLock<HashMap<String, VecDeque<String>>>,
    records: RwLock<HashMap<String, RecordEntry>>,
    counters: RwLock<HashMap<String, CounterEntry>>,
    sequence_counter: AtomicU64,
}

impl InMemoryDeliveryStore {
    /// Create a new in-memory store
    pub fn new() -> Self {
        Self {
            queues: RwLock::new(HashMap::new()),
            records: RwLock::new(HashMap::new()),
            counters: RwLock::new(HashMap::new()),
            sequence_counter: AtomicU64::new(0),
        }
    }

    /// Get the number of archive records, including expired ones
    pub fn record_count(&self) -> usize {
        self.records.read().len()
    }

    /// Get the number of queues holding at least one entry
    pub fn queue_count(&self) -> usize {
        self.queues.read().len()
    }

    /// Clear all data (for testing)
    pub fn clear(&self) {
        self.queues.write().clear();
        self.records.write().clear();
        self.counters.write().clear();
    }

    fn expiry(ttl: Duration) -> Result<DateTime<Utc>, StoreError> {
        let ttl = chrono::Duration::from_std(ttl)
            .map_err(|e| StoreError::Database(format!("invalid ttl: {}", e)))?;
        Ok(Utc::now() + ttl)
    }
}

impl Default for InMemoryDeliveryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DeliveryStore for InMemoryDeliveryStore {
    async fn push(&self, key: &str, payload: &str) -> Result<(), StoreError> {
        self.queues
            .write()
            .entry(key.to_string())
            .or_default()
            .push_back(payload.to_string());
        Ok(())
    }

    async fn peek_head(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self
            .queues
            .read()
            .get(key)
            .and_then(|q| q.front().cloned()))
    }

    async fn pop_head(&self, key: &str) -> Result<Option<String>, StoreError> {
        let mut queues = self.queues.write();
        let Some(queue) = queues.get_mut(key) else {
            return Ok(None);
        };
        let head = queue.pop_front();
        if queue.is_empty() {
            queues.remove(key);
        }
        Ok(head)
    }

    async fn update_head(&self, key: &str, payload: &str) -> Result<bool, StoreError> {
        let mut queues = self.queues.write();
        match queues.get_mut(key).and_then(|q| q.front_mut()) {
            Some(head) => {
                *head = payload.to_string();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn len(&self, key: &str) -> Result<usize, StoreError> {
        Ok(self.queues.read().get(key).map_or(0, |q| q.len()))
    }

    async fn items(&self, key: &str) -> Result<Vec<String>, StoreError> {
        Ok(self
            .queues
            .read()
            .get(key)
            .map(|q| q.iter().cloned().collect())
            .unwrap_or_default())
    }

    async fn list_queue_keys(&self, prefix: &str) -> Result<Vec<String>, StoreError> {
        let mut keys: Vec<String> = self
            .queues
            .read()
            .iter()
            .filter(|(k, q)| k.starts_with(prefix) && !q.is_empty())
            .map(|(k, _)| k.clone())
            .collect();
        keys.sort();
        Ok(keys)
    }

    async fn delete_queue(&self, key: &str) -> Result<usize, StoreError> {
        Ok(self.queues.write().remove(key).map_or(0, |q| q.len()))
    }

    async fn put_record(
        &self,
        key: &str,
        payload: &str,
        ttl: Duration,
    ) -> Result<(), StoreError> {
        let expires_at = Self::expiry(ttl)?;
        let seq = self.sequence_counter.fetch_add(1, Ordering::SeqCst);
        self.records.write().insert(
            key.to_string(),
            RecordEntry {
                payload: payload.to_string(),
                expires_at,
                seq,
            },
        );
        Ok(())
    }

    async fn list_records(&self, prefix: &str, limit: usize) -> Result<Vec<String>, StoreError> {
        let now = Utc::now();
        let records = self.records.read();
        let mut matching: Vec<&RecordEntry> = records
            .iter()
            .filter(|(k, r)| k.starts_with(prefix) && r.expires_at > now)
            .map(|(_, r)| r)
            .collect();
        matching.sort_by(|a, b| b.seq.cmp(&a.seq));

        Ok(matching
            .into_iter()
            .take(limit)
            .map(|r| r.payload.clone())
            .collect())
    }

    async fn purge_expired(&self) -> Result<u64, StoreError> {
        let now = Utc::now();
        let mut removed = 0u64;

        let mut records = self.records.write();
        let before = records.len();
        records.retain(|_, r| r.expires_at > now);
        removed += (before - records.len()) as u64;
        drop(records);

        let mut counters = self.counters.write();
        let before = counters.len();
        counters.retain(|_, c| c.expires_at > now);
        removed += (before - counters.len()) as u64;

        Ok(removed)
    }

    async fn incr_counter(&self, key: &str, ttl: Duration) -> Result<i64, StoreError> {
        let expires_at = Self::expiry(ttl)?;
        let now = Utc::now();
        let mut counters = self.counters.write();
        let entry = counters.entry(key.to_string()).or_insert(CounterEntry {
            value: 0,
            expires_at,
        });
        if entry.expires_at <= now {
            entry.value = 0;
        }
        entry.value += 1;
        entry.expires_at = expires_at;
        Ok(entry.value)
    }

    async fn get_counter(&self, key: &str) -> Result<i64, StoreError> {
        let now = Utc::now();
        Ok(self
            .counters
            .read()
            .get(key)
            .filter(|c| c.expires_at > now)
            .map_or(0, |c| c.value))
    }

    async fn delete_counter(&self, key: &str) -> Result<bool, StoreError> {
        Ok(self.counters.write().remove(key).is_some())
    }

    async fn list_counter_keys(&self, prefix: &str) -> Result<Vec<String>, StoreError> {
        let now = Utc::now();
        let mut keys: Vec<String> = self
            .counters
            .read()
            .iter()
            .filter(|(k, c)| k.starts_with(prefix) && c.expires_at > now)
            .map(|(k, _)| k.clone())
            .collect();
        keys.sort();
        Ok(keys)
    }
}
