//! Retry policy implementation

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::config::duration_millis;

/// Bound and backoff for transient delivery failures
///
/// Only transient failures consume retries; permanent failures are never
/// retried regardless of the policy. The session waits `delay` after every
/// transient failure before its next attempt.
///
/// # Example
///
/// ```
/// use herald_delivery::RetryPolicy;
/// use std::time::Duration;
///
/// let policy = RetryPolicy::fixed(Duration::from_secs(5), 3);
///
/// assert_eq!(policy.delay_for_retry(1), Duration::from_secs(5));
/// assert!(policy.has_retries_remaining(2));
/// assert!(!policy.has_retries_remaining(3));
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Transient failures after which an item is failed for good
    pub max_retries: u32,

    /// Wait after each transient failure
    #[serde(with = "duration_millis")]
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::fixed(Duration::from_secs(5), 3)
    }
}

impl RetryPolicy {
    /// Create a policy with a fixed delay between attempts
    pub fn fixed(delay: Duration, max_retries: u32) -> Self {
        Self { max_retries, delay }
    }

    /// Set the retry bound
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Set the delay between attempts
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Delay to wait after the `retry_count`-th transient failure (1-based)
    pub fn delay_for_retry(&self, retry_count: u32) -> Duration {
        if retry_count == 0 {
            Duration::ZERO
        } else {
            self.delay
        }
    }

    /// Whether an item with `retry_count` transient failures may be tried again
    pub fn has_retries_remaining(&self, retry_count: u32) -> bool {
        retry_count < self.max_retries
    }
}
