//! Delivery over the SQLite store
//!
//! Uses `sqlite::memory:`, so no database setup is needed.

use std::sync::Arc;

use herald_delivery::{
    DeliveryConfig, DeliveryQueue, DeliveryStore, DryRunConfig, DryRunTransport, ErrorKind,
    InMemorySessionRegistry, ItemStatus, SessionHandle, SessionOutcome, SqliteDeliveryStore,
};

async fn sqlite_queue(
    transport: Arc<DryRunTransport>,
) -> (DeliveryQueue, Arc<SqliteDeliveryStore>) {
    let store = Arc::new(
        SqliteDeliveryStore::in_memory()
            .await
            .expect("Failed to open in-memory SQLite"),
    );
    let registry = Arc::new(InMemorySessionRegistry::new());
    registry.register(SessionHandle::new("ieguillermo").with_authenticated(true));

    let queue = DeliveryQueue::new(
        store.clone(),
        registry,
        transport,
        DeliveryConfig::default(),
    );
    (queue, store)
}

#[tokio::test]
async fn test_deliver_and_archive() {
    let transport = Arc::new(DryRunTransport::new(
        DryRunConfig::default().with_recorded_sends(),
    ));
    let (queue, _store) = sqlite_queue(transport.clone()).await;

    let first = queue
        .enqueue("ieguillermo", "987 654 321", "Attendance: present")
        .await
        .unwrap();
    let second = queue
        .enqueue("ieguillermo", "912345678", "Attendance: late")
        .await
        .unwrap();

    let status = queue.get_status("ieguillermo").await.unwrap();
    assert_eq!(status.total, 2);
    assert_eq!(status.estimated_wait_seconds, 16);

    assert_eq!(queue.force_tick().await.delivered(), 1);
    assert_eq!(queue.force_tick().await.delivered(), 1);

    assert_eq!(
        transport.sent(),
        vec![
            ("ieguillermo".to_string(), "51987654321".to_string()),
            ("ieguillermo".to_string(), "51912345678".to_string()),
        ]
    );

    let history = queue.list_history("ieguillermo", 10).await.unwrap();
    let ids: Vec<&str> = history.iter().map(|i| i.id.as_str()).collect();
    assert_eq!(ids, vec![second.as_str(), first.as_str()]);
    assert!(history.iter().all(|i| i.status == ItemStatus::Completed));

    assert_eq!(queue.daily_count("ieguillermo").await.unwrap(), 2);
    assert!(queue.get_all_statuses().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_permanent_failure_lands_in_error_archive() {
    let transport = Arc::new(DryRunTransport::new(
        DryRunConfig::default().with_failure("51900000000", ErrorKind::NoSuchRecipient),
    ));
    let (queue, store) = sqlite_queue(transport.clone()).await;

    let id = queue
        .enqueue("ieguillermo", "900000000", "hello")
        .await
        .unwrap();

    let report = queue.force_tick().await;
    assert_eq!(
        report.outcome_for("ieguillermo"),
        Some(&SessionOutcome::Failed {
            item_id: id.clone(),
            permanent: true,
            retry_count: 0,
        })
    );

    assert_eq!(store.len("queue:ieguillermo").await.unwrap(), 0);
    let errors = queue.list_errors("ieguillermo", 10).await.unwrap();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].id, id);
    assert_eq!(transport.sent_count(), 0);
}

#[tokio::test]
async fn test_orphaned_queue_is_dropped() {
    let transport = Arc::new(DryRunTransport::default());
    let (queue, store) = sqlite_queue(transport.clone()).await;

    for _ in 0..5 {
        queue.enqueue("logged-out", "987654321", "m").await.unwrap();
    }

    let report = queue.force_tick().await;
    assert_eq!(
        report.outcome_for("logged-out"),
        Some(&SessionOutcome::Orphaned { purged: 5 })
    );
    assert!(store.list_queue_keys("queue:").await.unwrap().is_empty());
    assert!(queue
        .list_errors("logged-out", 10)
        .await
        .unwrap()
        .is_empty());
    assert_eq!(transport.sent_count(), 0);
}
