//! Messaging transport seam
//!
//! This module provides:
//! - [`MessagingTransport`] - the single operation the scheduler needs from a
//!   browser-automation driver
//! - [`ErrorKind`] - tagged failure classification (permanent vs transient)
//! - [`RecipientPolicy`] - number normalization and block list
//! - [`DryRunTransport`] - a log-only transport for local runs and tests

mod dry_run;
mod recipient;

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::session::SessionHandle;

pub use dry_run::{DryRunConfig, DryRunTransport};
pub use recipient::RecipientPolicy;

/// Delivery failure classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// The number is not registered on the messaging network
    NoSuchRecipient,

    /// The number is on the local block list
    Blocked,

    /// The send did not finish within the delivery timeout
    Timeout,

    /// An expected UI element never appeared
    UiElementNotFound,

    /// The browser session dropped
    Disconnected,

    /// Anything else
    Unknown,
}

impl ErrorKind {
    /// Permanent failures are archived immediately and never retried
    pub fn is_permanent(&self) -> bool {
        matches!(self, Self::NoSuchRecipient | Self::Blocked)
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoSuchRecipient => write!(f, "no_such_recipient"),
            Self::Blocked => write!(f, "blocked"),
            Self::Timeout => write!(f, "timeout"),
            Self::UiElementNotFound => write!(f, "ui_element_not_found"),
            Self::Disconnected => write!(f, "disconnected"),
            Self::Unknown => write!(f, "unknown"),
        }
    }
}

/// A failed delivery attempt
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind}: {message}")]
pub struct TransportError {
    pub kind: ErrorKind,
    pub message: String,
}

impl TransportError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn no_such_recipient(phone_number: &str) -> Self {
        Self::new(
            ErrorKind::NoSuchRecipient,
            format!("number {} is not registered", phone_number),
        )
    }

    pub fn blocked(phone_number: &str) -> Self {
        Self::new(
            ErrorKind::Blocked,
            format!("number {} is blocked", phone_number),
        )
    }

    pub fn timeout(limit: Duration) -> Self {
        Self::new(
            ErrorKind::Timeout,
            format!("delivery did not finish within {:?}", limit),
        )
    }

    pub fn is_permanent(&self) -> bool {
        self.kind.is_permanent()
    }
}

/// Sends one message through a live session
///
/// Implementations must be safe to call concurrently for different sessions;
/// the scheduler never calls them concurrently for the same session.
#[async_trait]
pub trait MessagingTransport: Send + Sync {
    async fn send(
        &self,
        session: &SessionHandle,
        phone_number: &str,
        message: &str,
    ) -> Result<(), TransportError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_permanent_kinds() {
        assert!(ErrorKind::NoSuchRecipient.is_permanent());
        assert!(ErrorKind::Blocked.is_permanent());
        for kind in [
            ErrorKind::Timeout,
            ErrorKind::UiElementNotFound,
            ErrorKind::Disconnected,
            ErrorKind::Unknown,
        ] {
            assert!(!kind.is_permanent(), "{kind} should be transient");
        }
    }

    #[test]
    fn test_error_display() {
        let err = TransportError::no_such_recipient("51987654321");
        assert_eq!(
            err.to_string(),
            "no_such_recipient: number 51987654321 is not registered"
        );
        assert!(err.is_permanent());

        let err = TransportError::timeout(Duration::from_secs(60));
        assert_eq!(err.kind, ErrorKind::Timeout);
        assert!(!err.is_permanent());
    }

    #[test]
    fn test_kind_serialization() {
        let json = serde_json::to_string(&ErrorKind::UiElementNotFound).unwrap();
        assert_eq!(json, "\"ui_element_not_found\"");
    }
}
