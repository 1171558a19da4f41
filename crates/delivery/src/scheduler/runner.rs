//! Delivery scheduler
//!
//! Moves every session queue forward by at most one item per tick, with at
//! most one transport call outstanding per session.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use futures::FutureExt;
use parking_lot::{Mutex, RwLock};
use tokio::sync::watch;
use tokio::task::{JoinError, JoinHandle, JoinSet};
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, instrument, warn};

use super::inflight::{InFlightGuard, InFlightSet};
use super::report::{SessionOutcome, SessionTick, TickReport};
use crate::archive::DeliveryArchive;
use crate::config::DeliveryConfig;
use crate::persistence::{DeliveryStore, StoreError};
use crate::queue::{keys, ItemStatus, QueueItem};
use crate::reliability::run_with_timeout;
use crate::session::{SessionHandle, SessionRegistry};
use crate::stats::StatsCounter;
use crate::transport::{MessagingTransport, TransportError};

/// Scheduler lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerStatus {
    /// Background loops are not running; ticks can still be forced
    Stopped,
    /// Tick and purge loops are running
    Running,
    /// Shutdown requested, waiting for loops to exit
    Draining,
}

/// Scheduler errors
#[derive(Debug, thiserror::Error)]
pub enum SchedulerError {
    /// Store error
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// Scheduler already running
    #[error("scheduler is already running")]
    AlreadyRunning,

    /// Shutdown timeout
    #[error("graceful shutdown timed out")]
    ShutdownTimeout,
}

/// Drives delivery for all session queues
///
/// # Example
///
/// ```ignore
/// use herald_delivery::{DeliveryConfig, DeliveryScheduler};
///
/// let scheduler = Arc::new(DeliveryScheduler::new(store, registry, transport, DeliveryConfig::default()));
///
/// // One pass by hand
/// let report = scheduler.tick().await;
///
/// // Or on a timer
/// scheduler.start()?;
/// // ... later, graceful shutdown
/// scheduler.shutdown().await?;
/// ```
pub struct DeliveryScheduler {
    store: Arc<dyn DeliveryStore>,
    registry: Arc<dyn SessionRegistry>,
    transport: Arc<dyn MessagingTransport>,
    archive: Arc<DeliveryArchive>,
    stats: Arc<StatsCounter>,
    config: DeliveryConfig,
    in_flight: Arc<InFlightSet>,
    tick_lock: tokio::sync::Mutex<()>,
    shutdown_tx: watch::Sender<bool>,
    status: RwLock<SchedulerStatus>,
    tick_handle: Mutex<Option<JoinHandle<()>>>,
    purge_handle: Mutex<Option<JoinHandle<()>>>,
}

impl DeliveryScheduler {
    /// Create a new scheduler
    pub fn new(
        store: Arc<dyn DeliveryStore>,
        registry: Arc<dyn SessionRegistry>,
        transport: Arc<dyn MessagingTransport>,
        config: DeliveryConfig,
    ) -> Self {
        let (shutdown_tx, _) = watch::channel(false);
        let archive = Arc::new(DeliveryArchive::new(
            Arc::clone(&store),
            config.history_ttl,
            config.error_ttl,
        ));
        let stats = Arc::new(StatsCounter::new(Arc::clone(&store), config.stats_ttl));

        Self {
            store,
            registry,
            transport,
            archive,
            stats,
            config,
            in_flight: Arc::new(InFlightSet::new()),
            tick_lock: tokio::sync::Mutex::new(()),
            shutdown_tx,
            status: RwLock::new(SchedulerStatus::Stopped),
            tick_handle: Mutex::new(None),
            purge_handle: Mutex::new(None),
        }
    }

    pub fn config(&self) -> &DeliveryConfig {
        &self.config
    }

    pub fn archive(&self) -> &Arc<DeliveryArchive> {
        &self.archive
    }

    pub fn stats(&self) -> &Arc<StatsCounter> {
        &self.stats
    }

    /// Get current status
    pub fn status(&self) -> SchedulerStatus {
        *self.status.read()
    }

    /// Whether a delivery for `session` is in flight right now
    pub fn is_processing(&self, session: &str) -> bool {
        self.in_flight.contains(session)
    }

    /// Start the tick and purge loops
    #[instrument(skip(self))]
    pub fn start(self: &Arc<Self>) -> Result<(), SchedulerError> {
        {
            let mut status = self.status.write();
            if *status != SchedulerStatus::Stopped {
                return Err(SchedulerError::AlreadyRunning);
            }
            *status = SchedulerStatus::Running;
        }

        info!(
            tick_interval_ms = self.config.tick_interval.as_millis() as u64,
            delivery_timeout_ms = self.config.delivery_timeout.as_millis() as u64,
            max_retries = self.config.retry.max_retries,
            "Starting delivery scheduler"
        );

        self.shutdown_tx.send_replace(false);
        self.start_tick_loop();
        self.start_purge_loop();

        Ok(())
    }

    /// Stop the background loops, waiting for an in-progress tick to finish
    #[instrument(skip(self))]
    pub async fn shutdown(&self) -> Result<(), SchedulerError> {
        {
            let mut status = self.status.write();
            if *status == SchedulerStatus::Stopped {
                return Ok(());
            }
            *status = SchedulerStatus::Draining;
        }

        info!("Initiating graceful shutdown");
        self.shutdown_tx.send_replace(true);

        let deadline = tokio::time::Instant::now() + self.config.shutdown_timeout;
        let tick_handle = self.tick_handle.lock().take();
        let purge_handle = self.purge_handle.lock().take();

        let mut timed_out = false;
        for handle in [tick_handle, purge_handle].into_iter().flatten() {
            let abort = handle.abort_handle();
            if tokio::time::timeout_at(deadline, handle).await.is_err() {
                abort.abort();
                timed_out = true;
            }
        }

        *self.status.write() = SchedulerStatus::Stopped;

        if timed_out {
            warn!("Shutdown timeout reached, background loops aborted");
            return Err(SchedulerError::ShutdownTimeout);
        }

        info!("Delivery scheduler stopped");
        Ok(())
    }

    /// Run one scheduling pass over every queue
    ///
    /// The scan claims every idle session under a short guard and then
    /// advances each claimed session by at most one item, concurrently.
    /// Sessions still owned by an earlier pass (mid-delivery or backing off)
    /// report `Busy`. A pass requested while another is still scanning is
    /// skipped.
    #[instrument(skip(self))]
    pub async fn tick(&self) -> TickReport {
        let claimed = {
            let Ok(_scan) = self.tick_lock.try_lock() else {
                debug!("Previous scan still running, skipping");
                return TickReport::skipped();
            };

            let queue_keys = match self.store.list_queue_keys(keys::QUEUE_PREFIX).await {
                Ok(keys) => keys,
                Err(e) => {
                    error!("Failed to list queues: {}", e);
                    return TickReport::default();
                }
            };

            queue_keys
                .into_iter()
                .filter_map(|key| {
                    let session = keys::session_from_queue_key(&key)?.to_string();
                    let guard = self.in_flight.try_acquire(&session);
                    Some((session, key, guard))
                })
                .collect::<Vec<_>>()
        };

        let passes = claimed.into_iter().map(|(session, key, guard)| async move {
            let outcome = match guard {
                Some(guard) => self.process_session_isolated(&session, &key, guard).await,
                None => {
                    debug!(%session, "Delivery already in flight");
                    SessionOutcome::Busy
                }
            };
            SessionTick { session, outcome }
        });
        let sessions = join_all(passes).await;

        TickReport {
            skipped: false,
            sessions,
        }
    }

    fn start_tick_loop(self: &Arc<Self>) {
        let scheduler = Arc::clone(self);
        let interval = self.config.tick_interval.max(Duration::from_millis(1));
        let mut shutdown_rx = self.shutdown_tx.subscribe();

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            // a pass lives as long as its slowest session
            let mut passes = JoinSet::new();

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        let scheduler = Arc::clone(&scheduler);
                        passes.spawn(async move { scheduler.tick().await });
                    }
                    Some(joined) = passes.join_next(), if !passes.is_empty() => {
                        log_pass(joined);
                    }
                    _ = shutdown_rx.changed() => {
                        debug!("Tick loop: shutdown requested");
                        break;
                    }
                }
            }

            while let Some(joined) = passes.join_next().await {
                log_pass(joined);
            }

            debug!("Tick loop exited");
        });

        *self.tick_handle.lock() = Some(handle);
    }

    fn start_purge_loop(&self) {
        let archive = Arc::clone(&self.archive);
        let interval = self.config.purge_interval.max(Duration::from_millis(1));
        let mut shutdown_rx = self.shutdown_tx.subscribe();

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        match archive.purge_expired().await {
                            Ok(removed) => {
                                if removed > 0 {
                                    info!(removed, "Purged expired records");
                                }
                            }
                            Err(e) => {
                                error!("Expired record purge failed: {}", e);
                            }
                        }
                    }
                    _ = shutdown_rx.changed() => {
                        debug!("Purge loop: shutdown requested");
                        break;
                    }
                }
            }

            debug!("Purge loop exited");
        });

        *self.purge_handle.lock() = Some(handle);
    }

    async fn process_session_isolated(
        &self,
        session: &str,
        key: &str,
        guard: InFlightGuard,
    ) -> SessionOutcome {
        AssertUnwindSafe(self.process_session(session, key, guard))
            .catch_unwind()
            .await
            .unwrap_or_else(|_| {
                error!(%session, "Session processing panicked");
                SessionOutcome::Panicked
            })
    }

    /// Advance one session; the in-flight flag is held until this returns,
    /// backoff included
    async fn process_session(
        &self,
        session: &str,
        key: &str,
        _in_flight: InFlightGuard,
    ) -> SessionOutcome {
        match self.advance(session, key).await {
            Ok(outcome) => outcome,
            Err(e) => {
                error!(%session, "Store error while processing queue: {}", e);
                SessionOutcome::StoreError {
                    message: e.to_string(),
                }
            }
        }
    }

    async fn advance(&self, session: &str, key: &str) -> Result<SessionOutcome, StoreError> {
        let Some(handle) = self.registry.lookup(session) else {
            let purged = self.store.delete_queue(key).await?;
            warn!(%session, purged, "Purged queue of unknown session");
            return Ok(SessionOutcome::Orphaned { purged });
        };

        if !handle.is_ready() {
            debug!(%session, "Session not authenticated, skipping");
            return Ok(SessionOutcome::NotReady);
        }

        let Some(item) = self.claim_head(key).await? else {
            return Ok(SessionOutcome::Idle);
        };

        self.deliver(&handle, key, item).await
    }

    /// Mark the first deliverable head item as processing
    ///
    /// Malformed entries are dropped; terminal leftovers from an interrupted
    /// run are archived. A head already marked processing can only be a
    /// leftover too, since this session's in-flight flag is held.
    async fn claim_head(&self, key: &str) -> Result<Option<QueueItem>, StoreError> {
        loop {
            let Some(raw) = self.store.peek_head(key).await? else {
                return Ok(None);
            };

            let mut item = match QueueItem::from_json(&raw) {
                Ok(item) => item,
                Err(e) => {
                    error!(%key, "Discarding malformed queue item: {}", e);
                    self.store.pop_head(key).await?;
                    continue;
                }
            };

            match item.status {
                ItemStatus::Completed | ItemStatus::Failed => {
                    warn!(item_id = %item.id, status = %item.status, "Archiving leftover terminal item");
                    self.store.pop_head(key).await?;
                    self.archive_best_effort(&item).await;
                    continue;
                }
                ItemStatus::Processing => {
                    warn!(item_id = %item.id, "Resuming item interrupted mid-delivery");
                }
                ItemStatus::Pending => {}
            }

            item.status = ItemStatus::Processing;
            item.error = None;
            self.store.update_head(key, &encode(&item)?).await?;
            return Ok(Some(item));
        }
    }

    async fn deliver(
        &self,
        session: &SessionHandle,
        key: &str,
        mut item: QueueItem,
    ) -> Result<SessionOutcome, StoreError> {
        debug!(
            item_id = %item.id,
            session = %session.name(),
            attempt = item.retry_count + 1,
            "Delivering message"
        );

        match self.attempt(session, &item).await {
            Ok(()) => {
                item.status = ItemStatus::Completed;
                item.error = None;
                self.settle_head(key, &item).await?;

                if let Err(e) = self.stats.increment_daily(session.name()).await {
                    warn!(session = %session.name(), "Failed to update daily stats: {}", e);
                }

                info!(item_id = %item.id, session = %session.name(), "Message delivered");
                Ok(SessionOutcome::Delivered { item_id: item.id })
            }
            Err(e) if e.is_permanent() => {
                item.status = ItemStatus::Failed;
                item.error = Some(e.to_string());
                self.settle_head(key, &item).await?;

                warn!(item_id = %item.id, kind = %e.kind, "Permanent delivery failure: {}", e.message);
                Ok(SessionOutcome::Failed {
                    item_id: item.id,
                    permanent: true,
                    retry_count: item.retry_count,
                })
            }
            Err(e) => {
                item.retry_count += 1;
                let retry_count = item.retry_count;

                let outcome = if self.config.retry.has_retries_remaining(retry_count) {
                    item.status = ItemStatus::Pending;
                    item.error = None;
                    self.requeue_head(key, &item).await?;

                    warn!(
                        item_id = %item.id,
                        retry_count,
                        kind = %e.kind,
                        "Transient delivery failure, re-queued: {}", e.message
                    );
                    SessionOutcome::Retrying {
                        item_id: item.id,
                        retry_count,
                    }
                } else {
                    item.status = ItemStatus::Failed;
                    item.error = Some(e.to_string());
                    self.settle_head(key, &item).await?;

                    error!(
                        item_id = %item.id,
                        retry_count,
                        kind = %e.kind,
                        "Retries exhausted: {}", e.message
                    );
                    SessionOutcome::Failed {
                        item_id: item.id,
                        permanent: false,
                        retry_count,
                    }
                };

                // back off before this session is eligible again
                tokio::time::sleep(self.config.retry.delay_for_retry(retry_count)).await;
                Ok(outcome)
            }
        }
    }

    async fn attempt(&self, session: &SessionHandle, item: &QueueItem) -> Result<(), TransportError> {
        let phone_number = self.config.recipient.prepare(&item.phone_number)?;

        match run_with_timeout(
            self.config.delivery_timeout,
            self.transport.send(session, &phone_number, &item.message),
        )
        .await
        {
            Ok(result) => result,
            Err(elapsed) => Err(TransportError::timeout(elapsed.limit())),
        }
    }

    /// Whether the head is still `id` (the queue may have been cleared meanwhile)
    async fn head_is(&self, key: &str, id: &str) -> Result<bool, StoreError> {
        let Some(raw) = self.store.peek_head(key).await? else {
            return Ok(false);
        };
        Ok(QueueItem::from_json(&raw).is_ok_and(|head| head.id == id))
    }

    /// Persist a terminal item at the head, pop it, then archive it
    async fn settle_head(&self, key: &str, item: &QueueItem) -> Result<(), StoreError> {
        if self.head_is(key, &item.id).await? {
            self.store.update_head(key, &encode(item)?).await?;
            self.store.pop_head(key).await?;
        } else {
            warn!(item_id = %item.id, "Queue changed during delivery, archiving only");
        }
        self.archive_best_effort(item).await;
        Ok(())
    }

    /// Append a copy of the head item at the tail, then drop the head
    async fn requeue_head(&self, key: &str, item: &QueueItem) -> Result<(), StoreError> {
        if !self.head_is(key, &item.id).await? {
            warn!(item_id = %item.id, "Queue changed during delivery, not re-queuing");
            return Ok(());
        }
        self.store.push(key, &encode(item)?).await?;
        self.store.pop_head(key).await?;
        Ok(())
    }

    async fn archive_best_effort(&self, item: &QueueItem) {
        if let Err(e) = self.archive.record(item).await {
            warn!(item_id = %item.id, "Failed to archive item: {}", e);
        }
    }
}

fn log_pass(joined: Result<TickReport, JoinError>) {
    match joined {
        Ok(report) if !report.sessions.is_empty() => {
            debug!(
                sessions = report.sessions.len(),
                delivered = report.delivered(),
                "Tick complete"
            );
        }
        Ok(_) => {}
        Err(e) => error!("Tick task failed: {}", e),
    }
}

fn encode(item: &QueueItem) -> Result<String, StoreError> {
    item.to_json()
        .map_err(|e| StoreError::Serialization(e.to_string()))
}
