//! Queue item and status

use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};

const ID_SUFFIX_ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
const ID_SUFFIX_LEN: usize = 9;

/// Item status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "snake_case")]
pub enum ItemStatus {
    /// Waiting for delivery (new or scheduled for retry)
    Pending,

    /// A delivery attempt is in flight
    Processing,

    /// Delivered
    Completed,

    /// Gave up (permanent failure or retries exhausted)
    Failed,
}

impl ItemStatus {
    /// Terminal items belong in an archive, never in a live queue
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

impl std::fmt::Display for ItemStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Processing => write!(f, "processing"),
            Self::Completed => write!(f, "completed"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

/// One outbound message bound to a session
///
/// Serialized as camelCase JSON in the durable store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct QueueItem {
    /// `{session}-{unixMillis}-{random}`
    pub id: String,

    /// Owning session; always matches the queue key
    pub session_name: String,

    /// Destination as given by the producer, normalized only at send time
    pub phone_number: String,

    /// Fully rendered message text
    pub message: String,

    /// Creation time
    pub timestamp: DateTime<Utc>,

    pub status: ItemStatus,

    /// Last failure reason, present only once the item has failed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    /// Transient failures so far
    #[serde(default)]
    pub retry_count: u32,
}

impl QueueItem {
    /// Create a new pending item
    pub fn new(
        session_name: impl Into<String>,
        phone_number: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        let session_name = session_name.into();
        let timestamp = Utc::now();

        Self {
            id: generate_id(&session_name, timestamp),
            session_name,
            phone_number: phone_number.into(),
            message: message.into(),
            timestamp,
            status: ItemStatus::Pending,
            error: None,
            retry_count: 0,
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn from_json(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }
}

fn generate_id(session_name: &str, at: DateTime<Utc>) -> String {
    let mut rng = rand::thread_rng();
    let suffix: String = (0..ID_SUFFIX_LEN)
        .map(|_| ID_SUFFIX_ALPHABET[rng.gen_range(0..ID_SUFFIX_ALPHABET.len())] as char)
        .collect();

    format!("{}-{}-{}", session_name, at.timestamp_millis(), suffix)
}
