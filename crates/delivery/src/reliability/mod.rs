//! Reliability patterns for message delivery
//!
//! This module provides:
//! - [`RetryPolicy`] - Retry bound with a fixed backoff
//! - [`run_with_timeout`] - Hard deadline around a delivery attempt

mod retry;
mod timeout;

pub use retry::RetryPolicy;
pub use timeout::{run_with_timeout, TimeoutError};
