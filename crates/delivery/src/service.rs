//! Producer and operational API
//!
//! [`DeliveryQueue`] is the single entry point used by request handlers:
//! producers enqueue through it and operators inspect or reset queues with
//! it. Delivery itself is owned by the wrapped [`DeliveryScheduler`].

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};

use crate::config::DeliveryConfig;
use crate::persistence::{DeliveryStore, StoreError};
use crate::queue::{keys, ItemStatus, QueueItem, SessionNameError};
use crate::scheduler::{DeliveryScheduler, SchedulerError, TickReport};
use crate::session::SessionRegistry;
use crate::stats::SessionStats;
use crate::transport::MessagingTransport;

/// Facade errors
#[derive(Debug, thiserror::Error)]
pub enum DeliveryError {
    /// Store error
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Scheduler lifecycle error
    #[error(transparent)]
    Scheduler(#[from] SchedulerError),

    /// Session name cannot be used as a queue key
    #[error("invalid session name: {0}")]
    InvalidSession(#[from] SessionNameError),
}

/// Snapshot of one session queue
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct QueueStatus {
    pub session_name: String,
    /// Entries in the live queue, including unreadable ones
    pub total: usize,
    pub pending: usize,
    pub processing: usize,
    /// Terminal leftovers not yet archived
    pub completed: usize,
    pub failed: usize,
    /// A transport call for this session is outstanding
    pub is_processing: bool,
    pub estimated_wait_seconds: u64,
}

/// Durable per-session delivery queue
///
/// # Example
///
/// ```ignore
/// use herald_delivery::prelude::*;
///
/// let queue = DeliveryQueue::new(store, registry, transport, DeliveryConfig::default());
/// queue.start()?;
///
/// let id = queue.enqueue("ieguillermo", "987654321", "Attendance: present").await?;
/// let status = queue.get_status("ieguillermo").await?;
/// ```
pub struct DeliveryQueue {
    store: Arc<dyn DeliveryStore>,
    scheduler: Arc<DeliveryScheduler>,
}

impl DeliveryQueue {
    pub fn new(
        store: Arc<dyn DeliveryStore>,
        registry: Arc<dyn SessionRegistry>,
        transport: Arc<dyn MessagingTransport>,
        config: DeliveryConfig,
    ) -> Self {
        let scheduler = Arc::new(DeliveryScheduler::new(
            Arc::clone(&store),
            registry,
            transport,
            config,
        ));
        Self { store, scheduler }
    }

    pub fn scheduler(&self) -> &Arc<DeliveryScheduler> {
        &self.scheduler
    }

    pub fn config(&self) -> &DeliveryConfig {
        self.scheduler.config()
    }

    /// Start background delivery
    pub fn start(&self) -> Result<(), DeliveryError> {
        self.scheduler.start()?;
        Ok(())
    }

    /// Stop background delivery
    pub async fn shutdown(&self) -> Result<(), DeliveryError> {
        self.scheduler.shutdown().await?;
        Ok(())
    }

    // =========================================================================
    // Producer API
    // =========================================================================

    /// Append a message to the session's queue, returning its id
    ///
    /// Session existence is not checked here; a queue whose session is gone
    /// is purged on the next tick. The name itself must be a valid key
    /// segment.
    #[instrument(skip(self, message), fields(session = %session))]
    pub async fn enqueue(
        &self,
        session: &str,
        phone_number: &str,
        message: &str,
    ) -> Result<String, DeliveryError> {
        keys::validate_session_name(session)?;

        let phone_number = match &self.config().override_recipient {
            Some(override_number) => {
                warn!(
                    original = %phone_number,
                    redirected_to = %override_number,
                    "Override recipient active, redirecting message"
                );
                override_number.as_str()
            }
            None => phone_number,
        };

        let item = QueueItem::new(session, phone_number, message);
        self.store
            .push(&keys::queue_key(session), &item.to_json()?)
            .await?;

        info!(item_id = %item.id, "Message enqueued");
        Ok(item.id)
    }

    // =========================================================================
    // Operational API
    // =========================================================================

    pub async fn get_status(&self, session: &str) -> Result<QueueStatus, DeliveryError> {
        let entries = self.store.items(&keys::queue_key(session)).await?;

        let mut status = QueueStatus {
            session_name: session.to_string(),
            total: entries.len(),
            pending: 0,
            processing: 0,
            completed: 0,
            failed: 0,
            is_processing: self.scheduler.is_processing(session),
            estimated_wait_seconds: 0,
        };

        for item in entries.iter().filter_map(|raw| QueueItem::from_json(raw).ok()) {
            match item.status {
                ItemStatus::Pending => status.pending += 1,
                ItemStatus::Processing => status.processing += 1,
                ItemStatus::Completed => status.completed += 1,
                ItemStatus::Failed => status.failed += 1,
            }
        }

        let waiting = (status.pending + status.processing) as u64;
        status.estimated_wait_seconds = waiting * self.config().average_delivery_time.as_secs();

        Ok(status)
    }

    /// Status of every non-empty queue
    pub async fn get_all_statuses(&self) -> Result<Vec<QueueStatus>, DeliveryError> {
        let queue_keys = self.store.list_queue_keys(keys::QUEUE_PREFIX).await?;

        let mut statuses = Vec::with_capacity(queue_keys.len());
        for session in queue_keys
            .iter()
            .filter_map(|k| keys::session_from_queue_key(k))
        {
            statuses.push(self.get_status(session).await?);
        }
        Ok(statuses)
    }

    /// Drop every live item of a session, returning how many were removed
    #[instrument(skip(self))]
    pub async fn clear_queue(&self, session: &str) -> Result<usize, DeliveryError> {
        let removed = self.store.delete_queue(&keys::queue_key(session)).await?;
        info!(%session, removed, "Queue cleared");
        Ok(removed)
    }

    pub async fn list_errors(
        &self,
        session: &str,
        limit: usize,
    ) -> Result<Vec<QueueItem>, DeliveryError> {
        Ok(self.scheduler.archive().list_errors(session, limit).await?)
    }

    pub async fn list_history(
        &self,
        session: &str,
        limit: usize,
    ) -> Result<Vec<QueueItem>, DeliveryError> {
        Ok(self.scheduler.archive().list_history(session, limit).await?)
    }

    /// Run one scheduling pass now
    ///
    /// Waits for the sessions it claimed; skipped (and reported as such) when
    /// another pass is still scanning.
    pub async fn force_tick(&self) -> TickReport {
        self.scheduler.tick().await
    }

    // =========================================================================
    // Stats
    // =========================================================================

    pub async fn session_stats(&self, session: &str) -> Result<SessionStats, DeliveryError> {
        Ok(self.scheduler.stats().session_stats(session).await?)
    }

    pub async fn all_session_stats(&self) -> Result<Vec<SessionStats>, DeliveryError> {
        Ok(self.scheduler.stats().all_session_stats().await?)
    }

    /// Deliveries so far today
    pub async fn daily_count(&self, session: &str) -> Result<i64, DeliveryError> {
        Ok(self.scheduler.stats().get_daily(session).await?)
    }

    pub async fn reset_daily_stats(&self, session: &str) -> Result<bool, DeliveryError> {
        Ok(self.scheduler.stats().reset_daily(session).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persistence::InMemoryDeliveryStore;
    use crate::session::{InMemorySessionRegistry, SessionHandle};
    use crate::transport::DryRunTransport;
    use std::time::Duration;

    fn queue_with(config: DeliveryConfig) -> (DeliveryQueue, Arc<InMemoryDeliveryStore>) {
        let store = Arc::new(InMemoryDeliveryStore::new());
        let registry = Arc::new(InMemorySessionRegistry::new());
        registry.register(SessionHandle::new("s1").with_authenticated(true));

        let queue = DeliveryQueue::new(
            store.clone(),
            registry,
            Arc::new(DryRunTransport::default()),
            config,
        );
        (queue, store)
    }

    #[tokio::test]
    async fn test_enqueue_appends_pending_item() {
        let (queue, store) = queue_with(DeliveryConfig::default());

        let id = queue.enqueue("s1", "987654321", "hello").await.unwrap();
        assert!(id.starts_with("s1-"));

        let raw = store.items("queue:s1").await.unwrap();
        assert_eq!(raw.len(), 1);
        let item = QueueItem::from_json(&raw[0]).unwrap();
        assert_eq!(item.id, id);
        assert_eq!(item.status, ItemStatus::Pending);
        assert_eq!(item.phone_number, "987654321");
    }

    #[tokio::test]
    async fn test_enqueue_rejects_names_that_share_a_key_prefix() {
        let (queue, store) = queue_with(DeliveryConfig::default());

        let err = queue.enqueue("s1:b", "987654321", "hello").await.unwrap_err();
        assert!(matches!(
            err,
            DeliveryError::InvalidSession(SessionNameError::InvalidCharacter)
        ));
        assert!(store.list_queue_keys("queue:").await.unwrap().is_empty());

        // a valid session's archive never sees another session's records
        queue.enqueue("s1", "987654321", "hello").await.unwrap();
        queue.force_tick().await;
        assert_eq!(queue.list_history("s1", 10).await.unwrap().len(), 1);
        assert!(queue.list_history("s", 10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_override_recipient_replaces_destination() {
        let config = DeliveryConfig::default().with_override_recipient("999000111");
        let (queue, store) = queue_with(config);

        queue.enqueue("s1", "987654321", "hello").await.unwrap();

        let raw = store.items("queue:s1").await.unwrap();
        let item = QueueItem::from_json(&raw[0]).unwrap();
        assert_eq!(item.phone_number, "999000111");
    }

    #[tokio::test]
    async fn test_status_counts_and_estimate() {
        let config =
            DeliveryConfig::default().with_average_delivery_time(Duration::from_secs(8));
        let (queue, store) = queue_with(config);

        queue.enqueue("s1", "1", "a").await.unwrap();
        queue.enqueue("s1", "2", "b").await.unwrap();
        store.push("queue:s1", "{garbage").await.unwrap();

        let status = queue.get_status("s1").await.unwrap();
        assert_eq!(status.total, 3);
        assert_eq!(status.pending, 2);
        assert_eq!(status.processing, 0);
        assert!(!status.is_processing);
        assert_eq!(status.estimated_wait_seconds, 16);
    }

    #[tokio::test]
    async fn test_status_of_unknown_queue_is_empty() {
        let (queue, _) = queue_with(DeliveryConfig::default());
        let status = queue.get_status("nobody").await.unwrap();
        assert_eq!(status.total, 0);
        assert_eq!(status.estimated_wait_seconds, 0);
    }

    #[tokio::test]
    async fn test_all_statuses_and_clear() {
        let (queue, _) = queue_with(DeliveryConfig::default());
        queue.enqueue("s1", "1", "a").await.unwrap();
        queue.enqueue("s2", "1", "a").await.unwrap();
        queue.enqueue("s2", "2", "b").await.unwrap();

        let statuses = queue.get_all_statuses().await.unwrap();
        let names: Vec<&str> = statuses.iter().map(|s| s.session_name.as_str()).collect();
        assert_eq!(names, vec!["s1", "s2"]);

        assert_eq!(queue.clear_queue("s2").await.unwrap(), 2);
        assert_eq!(queue.get_all_statuses().await.unwrap().len(), 1);
    }

    #[test]
    fn test_status_json_is_camel_case() {
        let status = QueueStatus {
            session_name: "s1".into(),
            total: 1,
            pending: 1,
            processing: 0,
            completed: 0,
            failed: 0,
            is_processing: false,
            estimated_wait_seconds: 8,
        };
        let value = serde_json::to_value(&status).unwrap();
        assert_eq!(value["sessionName"], "s1");
        assert_eq!(value["isProcessing"], false);
        assert_eq!(value["estimatedWaitSeconds"], 8);
    }
}
