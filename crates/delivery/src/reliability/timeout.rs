//! Delivery timeout enforcement
//!
//! A delivery attempt that exceeds its deadline is abandoned: the future is
//! dropped and the attempt counts as a transient `Timeout` failure.

use std::future::Future;
use std::time::Duration;

use thiserror::Error;

/// Timeout-related errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TimeoutError {
    /// The operation did not finish before the deadline
    #[error("operation timed out (limit {limit:?})")]
    Elapsed { limit: Duration },
}

impl TimeoutError {
    pub fn limit(&self) -> Duration {
        match self {
            Self::Elapsed { limit } => *limit,
        }
    }
}

/// Run `future` with a hard deadline
pub async fn run_with_timeout<F>(limit: Duration, future: F) -> Result<F::Output, TimeoutError>
where
    F: Future,
{
    tokio::time::timeout(limit, future)
        .await
        .map_err(|_| TimeoutError::Elapsed { limit })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_completes_within_limit() {
        let result = run_with_timeout(Duration::from_secs(60), async {
            tokio::time::sleep(Duration::from_secs(10)).await;
            42
        })
        .await;

        assert_eq!(result, Ok(42));
    }

    #[tokio::test(start_paused = true)]
    async fn test_elapsed() {
        let started = tokio::time::Instant::now();
        let result = run_with_timeout(Duration::from_secs(60), async {
            tokio::time::sleep(Duration::from_secs(3600)).await;
        })
        .await;

        let err = result.unwrap_err();
        assert_eq!(err.limit(), Duration::from_secs(60));
        assert!(started.elapsed() >= Duration::from_secs(60));
        assert!(started.elapsed() < Duration::from_secs(61));
    }
}
