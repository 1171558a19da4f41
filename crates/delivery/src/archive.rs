//! History and error archives
//!
//! Terminal items leave the live queue and are written once to exactly one
//! archive: `history:{session}:{id}` for completed items, `errors:{session}:{id}`
//! for failed ones. Both expire on their own TTL.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use crate::persistence::{DeliveryStore, StoreError};
use crate::queue::{keys, ItemStatus, QueueItem};

/// Which archive a record lives in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveKind {
    History,
    Errors,
}

pub struct DeliveryArchive {
    store: Arc<dyn DeliveryStore>,
    history_ttl: Duration,
    error_ttl: Duration,
}

impl DeliveryArchive {
    pub fn new(store: Arc<dyn DeliveryStore>, history_ttl: Duration, error_ttl: Duration) -> Self {
        Self {
            store,
            history_ttl,
            error_ttl,
        }
    }

    /// Archive a terminal item according to its status
    ///
    /// Returns the archive written to, or `None` for non-terminal items.
    pub async fn record(&self, item: &QueueItem) -> Result<Option<ArchiveKind>, StoreError> {
        let (kind, key, ttl) = match item.status {
            ItemStatus::Completed => (
                ArchiveKind::History,
                keys::history_key(&item.session_name, &item.id),
                self.history_ttl,
            ),
            ItemStatus::Failed => (
                ArchiveKind::Errors,
                keys::errors_key(&item.session_name, &item.id),
                self.error_ttl,
            ),
            ItemStatus::Pending | ItemStatus::Processing => return Ok(None),
        };

        let payload = item
            .to_json()
            .map_err(|e| StoreError::Serialization(e.to_string()))?;
        self.store.put_record(&key, &payload, ttl).await?;

        debug!(item_id = %item.id, archive = ?kind, "Archived item");
        Ok(Some(kind))
    }

    /// Most recent failed items for a session, newest first
    pub async fn list_errors(
        &self,
        session: &str,
        limit: usize,
    ) -> Result<Vec<QueueItem>, StoreError> {
        self.list(&keys::errors_prefix(session), limit).await
    }

    /// Most recent completed items for a session, newest first
    pub async fn list_history(
        &self,
        session: &str,
        limit: usize,
    ) -> Result<Vec<QueueItem>, StoreError> {
        self.list(&keys::history_prefix(session), limit).await
    }

    /// Drop expired records
    pub async fn purge_expired(&self) -> Result<u64, StoreError> {
        self.store.purge_expired().await
    }

    async fn list(&self, prefix: &str, limit: usize) -> Result<Vec<QueueItem>, StoreError> {
        let records = self.store.list_records(prefix, limit).await?;

        Ok(records
            .iter()
            .filter_map(|raw| match QueueItem::from_json(raw) {
                Ok(item) => Some(item),
                Err(e) => {
                    warn!(%prefix, "Skipping unreadable archive record: {}", e);
                    None
                }
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persistence::InMemoryDeliveryStore;

    fn archive() -> DeliveryArchive {
        DeliveryArchive::new(
            Arc::new(InMemoryDeliveryStore::new()),
            Duration::from_secs(24 * 3600),
            Duration::from_secs(7 * 24 * 3600),
        )
    }

    #[tokio::test]
    async fn test_completed_goes_to_history() {
        let archive = archive();
        let mut item = QueueItem::new("a", "987654321", "hi");
        item.status = ItemStatus::Completed;

        assert_eq!(archive.record(&item).await.unwrap(), Some(ArchiveKind::History));
        assert_eq!(archive.list_history("a", 10).await.unwrap(), vec![item]);
        assert!(archive.list_errors("a", 10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_failed_goes_to_errors() {
        let archive = archive();
        let mut item = QueueItem::new("a", "987654321", "hi");
        item.status = ItemStatus::Failed;
        item.error = Some("no_such_recipient: gone".to_string());

        assert_eq!(archive.record(&item).await.unwrap(), Some(ArchiveKind::Errors));
        let errors = archive.list_errors("a", 10).await.unwrap();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].error.as_deref(), Some("no_such_recipient: gone"));
    }

    #[tokio::test]
    async fn test_live_items_not_archived() {
        let archive = archive();
        let item = QueueItem::new("a", "987654321", "hi");
        assert_eq!(archive.record(&item).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_sessions_are_isolated() {
        let archive = archive();
        for session in ["a", "ab"] {
            let mut item = QueueItem::new(session, "987654321", "hi");
            item.status = ItemStatus::Failed;
            archive.record(&item).await.unwrap();
        }

        assert_eq!(archive.list_errors("a", 10).await.unwrap().len(), 1);
        assert_eq!(archive.list_errors("ab", 10).await.unwrap().len(), 1);
    }
}
