//! Delivery configuration

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::reliability::RetryPolicy;
use crate::transport::RecipientPolicy;

/// Delivery queue configuration
///
/// # Example
///
/// ```
/// use herald_delivery::{DeliveryConfig, RetryPolicy};
/// use std::time::Duration;
///
/// let config = DeliveryConfig::default()
///     .with_tick_interval(Duration::from_millis(500))
///     .with_retry(RetryPolicy::fixed(Duration::from_secs(2), 5));
///
/// assert_eq!(config.delivery_timeout, Duration::from_secs(60));
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DeliveryConfig {
    /// How often the scheduler scans queues
    #[serde(with = "duration_millis")]
    pub tick_interval: Duration,

    /// Hard limit on a single transport call
    #[serde(with = "duration_millis")]
    pub delivery_timeout: Duration,

    /// Retry bound and backoff for transient failures
    pub retry: RetryPolicy,

    /// Destination normalization and block list
    pub recipient: RecipientPolicy,

    /// Lifetime of completed-item records
    #[serde(with = "duration_millis")]
    pub history_ttl: Duration,

    /// Lifetime of failed-item records
    #[serde(with = "duration_millis")]
    pub error_ttl: Duration,

    /// Lifetime of daily counters
    #[serde(with = "duration_millis")]
    pub stats_ttl: Duration,

    /// How often expired records are swept
    #[serde(with = "duration_millis")]
    pub purge_interval: Duration,

    /// Per-item estimate used for queue wait reporting
    #[serde(with = "duration_millis")]
    pub average_delivery_time: Duration,

    /// Test mode: redirect every enqueued message to this number
    #[serde(default)]
    pub override_recipient: Option<String>,

    /// How long shutdown waits for an in-progress tick
    #[serde(with = "duration_millis")]
    pub shutdown_timeout: Duration,
}

impl Default for DeliveryConfig {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_secs(1),
            delivery_timeout: Duration::from_secs(60),
            retry: RetryPolicy::default(),
            recipient: RecipientPolicy::default(),
            history_ttl: Duration::from_secs(24 * 60 * 60),
            error_ttl: Duration::from_secs(7 * 24 * 60 * 60),
            stats_ttl: Duration::from_secs(48 * 60 * 60),
            purge_interval: Duration::from_secs(10 * 60),
            average_delivery_time: Duration::from_secs(8),
            override_recipient: None,
            shutdown_timeout: Duration::from_secs(90),
        }
    }
}

impl DeliveryConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the tick interval
    pub fn with_tick_interval(mut self, interval: Duration) -> Self {
        self.tick_interval = interval;
        self
    }

    /// Set the transport timeout
    pub fn with_delivery_timeout(mut self, timeout: Duration) -> Self {
        self.delivery_timeout = timeout;
        self
    }

    /// Set the retry policy
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Set the recipient policy
    pub fn with_recipient(mut self, recipient: RecipientPolicy) -> Self {
        self.recipient = recipient;
        self
    }

    /// Set archive lifetimes
    pub fn with_archive_ttls(mut self, history: Duration, errors: Duration) -> Self {
        self.history_ttl = history;
        self.error_ttl = errors;
        self
    }

    /// Set the counter lifetime
    pub fn with_stats_ttl(mut self, ttl: Duration) -> Self {
        self.stats_ttl = ttl;
        self
    }

    /// Set the expiry sweep interval
    pub fn with_purge_interval(mut self, interval: Duration) -> Self {
        self.purge_interval = interval;
        self
    }

    /// Set the per-item wait estimate
    pub fn with_average_delivery_time(mut self, time: Duration) -> Self {
        self.average_delivery_time = time;
        self
    }

    /// Redirect all new messages to one number
    pub fn with_override_recipient(mut self, phone_number: impl Into<String>) -> Self {
        self.override_recipient = Some(phone_number.into());
        self
    }

    /// Set the shutdown timeout
    pub fn with_shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.shutdown_timeout = timeout;
        self
    }
}

/// Serde support for Duration as milliseconds
pub(crate) mod duration_millis {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        duration.as_millis().serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}
