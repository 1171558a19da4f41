//! # Herald Delivery
//!
//! A durable, multi-session notification delivery queue.
//!
//! ## Features
//!
//! - **Per-session FIFO**: one queue per messaging session, persisted as JSON items
//! - **Single delivery per session**: never two outstanding transport calls for one session
//! - **Retries**: transient failures are re-queued with backoff up to a bound
//! - **Failure classification**: permanent failures are archived without retry
//! - **Archives and stats**: TTL-bounded history/error records and daily counters
//! - **Orphan reconciliation**: queues of sessions that no longer exist are purged
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      DeliveryQueue                           │
//! │  (enqueue, status, clear, archives, stats, force tick)      │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    DeliveryScheduler                         │
//! │  (1s tick, in-flight set, SessionRegistry, Transport)       │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      DeliveryStore                           │
//! │  (SQLite: queue items, archive records, daily counters)     │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Example
//!
//! ```ignore
//! use herald_delivery::prelude::*;
//!
//! let store = Arc::new(SqliteDeliveryStore::connect("sqlite://herald.db?mode=rwc", 5).await?);
//! let registry = Arc::new(InMemorySessionRegistry::new());
//! registry.register(SessionHandle::new("ieguillermo").with_authenticated(true));
//!
//! let queue = DeliveryQueue::new(store, registry, Arc::new(my_transport), DeliveryConfig::default());
//! queue.start()?;
//!
//! queue.enqueue("ieguillermo", "987654321", "Attendance registered").await?;
//! ```

pub mod archive;
pub mod config;
pub mod persistence;
pub mod queue;
pub mod reliability;
pub mod scheduler;
pub mod service;
pub mod session;
pub mod stats;
pub mod transport;

/// Prelude for common imports
pub mod prelude {
    pub use crate::config::DeliveryConfig;
    pub use crate::persistence::{
        DeliveryStore, InMemoryDeliveryStore, SqliteDeliveryStore, StoreError,
    };
    pub use crate::queue::{ItemStatus, QueueItem};
    pub use crate::reliability::RetryPolicy;
    pub use crate::scheduler::{DeliveryScheduler, SessionOutcome, TickReport};
    pub use crate::service::{DeliveryError, DeliveryQueue, QueueStatus};
    pub use crate::session::{InMemorySessionRegistry, SessionHandle, SessionRegistry};
    pub use crate::stats::{DailyCount, SessionStats};
    pub use crate::transport::{
        ErrorKind, MessagingTransport, RecipientPolicy, TransportError,
    };
}

// Re-export key types at crate root
pub use archive::{ArchiveKind, DeliveryArchive};
pub use config::DeliveryConfig;
pub use persistence::{DeliveryStore, InMemoryDeliveryStore, SqliteDeliveryStore, StoreError};
pub use queue::{validate_session_name, ItemStatus, QueueItem, SessionNameError};
pub use reliability::RetryPolicy;
pub use scheduler::{
    DeliveryScheduler, SchedulerError, SchedulerStatus, SessionOutcome, SessionTick, TickReport,
};
pub use service::{DeliveryError, DeliveryQueue, QueueStatus};
pub use session::{InMemorySessionRegistry, SessionHandle, SessionInfo, SessionRegistry};
pub use stats::{DailyCount, SessionStats, StatsCounter};
pub use transport::{
    DryRunConfig, DryRunTransport, ErrorKind, MessagingTransport, RecipientPolicy, TransportError,
};
