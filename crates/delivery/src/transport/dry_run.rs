//! Dry-run transport
//!
//! Logs every message instead of driving a browser. Used for local runs
//! without a messaging account and as a deterministic transport in tests.
//! Supports:
//! - Configurable latency per send
//! - Scripted failures per destination number
//! - Send counting, with an opt-in log of destinations

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tracing::info;

use super::{ErrorKind, MessagingTransport, TransportError};
use crate::session::SessionHandle;

/// Configuration for the dry-run transport
#[derive(Debug, Clone, Default)]
pub struct DryRunConfig {
    /// Simulated time per send (default: none)
    pub latency: Duration,
    /// Destination numbers that always fail with the given kind
    pub failures: HashMap<String, ErrorKind>,
    /// Keep `(session, phone_number)` of every send; off for long-running use
    pub record_sends: bool,
}

impl DryRunConfig {
    /// Set the simulated latency
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Make every send to `phone_number` fail with `kind`
    pub fn with_failure(mut self, phone_number: impl Into<String>, kind: ErrorKind) -> Self {
        self.failures.insert(phone_number.into(), kind);
        self
    }

    /// Remember every successful send for [`DryRunTransport::sent`]
    pub fn with_recorded_sends(mut self) -> Self {
        self.record_sends = true;
        self
    }
}

/// A transport that pretends to deliver
#[derive(Debug, Default)]
pub struct DryRunTransport {
    config: DryRunConfig,
    sent_count: AtomicUsize,
    sent: Mutex<Vec<(String, String)>>,
}

impl DryRunTransport {
    pub fn new(config: DryRunConfig) -> Self {
        Self {
            config,
            sent_count: AtomicUsize::new(0),
            sent: Mutex::new(Vec::new()),
        }
    }

    /// Number of successful sends
    pub fn sent_count(&self) -> usize {
        self.sent_count.load(Ordering::SeqCst)
    }

    /// `(session, phone_number)` of every successful send, in order
    ///
    /// Always empty unless the config enables `record_sends`.
    pub fn sent(&self) -> Vec<(String, String)> {
        self.sent.lock().clone()
    }
}

#[async_trait]
impl MessagingTransport for DryRunTransport {
    async fn send(
        &self,
        session: &SessionHandle,
        phone_number: &str,
        message: &str,
    ) -> Result<(), TransportError> {
        if !self.config.latency.is_zero() {
            tokio::time::sleep(self.config.latency).await;
        }

        if let Some(kind) = self.config.failures.get(phone_number) {
            return Err(TransportError::new(
                *kind,
                format!("dry-run failure for {}", phone_number),
            ));
        }

        info!(
            session = %session.name(),
            phone_number = %phone_number,
            chars = message.chars().count(),
            "Dry-run delivery"
        );

        self.sent_count.fetch_add(1, Ordering::SeqCst);
        if self.config.record_sends {
            self.sent
                .lock()
                .push((session.name().to_string(), phone_number.to_string()));
        }
        Ok(())
    }
}
