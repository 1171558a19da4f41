//! Tick-driven delivery scheduling
//!
//! This module provides:
//! - [`DeliveryScheduler`] - Walks every session queue once per tick
//! - [`InFlightSet`] - One-delivery-per-session admission
//! - [`TickReport`] - Per-session outcome of a single pass
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    DeliveryScheduler                         │
//! │  ┌─────────────┐                    ┌─────────────────────┐  │
//! │  │  Tick loop  │                    │    Purge loop       │  │
//! │  │    (1s)     │                    │     (10min)         │  │
//! │  └──────┬──────┘                    └─────────────────────┘  │
//! │         │ scan guard, one spawned pass per tick              │
//! │         ▼                                                    │
//! │  ┌─────────────────────────────────────────────────────┐    │
//! │  │   queue:a   queue:b   queue:c   ...  (concurrent)    │    │
//! │  │   one head item each, flag held through backoff      │    │
//! │  └─────────────────────────────────────────────────────┘    │
//! │         │                                                    │
//! │         ▼                                                    │
//! │  MessagingTransport ──▶ archive / stats / re-queue           │
//! └─────────────────────────────────────────────────────────────┘
//! ```

mod inflight;
mod report;
mod runner;

pub use inflight::{InFlightGuard, InFlightSet};
pub use report::{SessionOutcome, SessionTick, TickReport};
pub use runner::{DeliveryScheduler, SchedulerError, SchedulerStatus};
