//! Persisted key layout
//!
//! ```text
//! queue:{session}                  ordered pending work
//! history:{session}:{id}           completed items (24h)
//! errors:{session}:{id}            failed items (7d)
//! stats:daily:{session}:{date}     delivered count per UTC day (48h)
//! ```
//!
//! Session names are the segment before an archive id, so they may not
//! contain the `:` separator (see [`validate_session_name`]).

use chrono::NaiveDate;

pub const QUEUE_PREFIX: &str = "queue:";
pub const HISTORY_PREFIX: &str = "history:";
pub const ERRORS_PREFIX: &str = "errors:";
pub const DAILY_STATS_PREFIX: &str = "stats:daily:";

/// Maximum size for a session name
pub const MAX_SESSION_NAME_BYTES: usize = 64;

/// Why a session name cannot be used in a key
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum SessionNameError {
    #[error("session name must not be empty")]
    Empty,

    #[error("session name is too long")]
    TooLong,

    #[error("session name must not contain ':' or whitespace")]
    InvalidCharacter,
}

/// Check that `name` forms an unambiguous key segment
pub fn validate_session_name(name: &str) -> Result<(), SessionNameError> {
    if name.is_empty() {
        return Err(SessionNameError::Empty);
    }
    if name.len() > MAX_SESSION_NAME_BYTES {
        return Err(SessionNameError::TooLong);
    }
    if name.chars().any(|c| c == ':' || c.is_whitespace()) {
        return Err(SessionNameError::InvalidCharacter);
    }
    Ok(())
}

pub fn queue_key(session: &str) -> String {
    format!("{QUEUE_PREFIX}{session}")
}

/// Session name encoded in a queue key
pub fn session_from_queue_key(key: &str) -> Option<&str> {
    key.strip_prefix(QUEUE_PREFIX).filter(|s| !s.is_empty())
}

pub fn history_key(session: &str, id: &str) -> String {
    format!("{HISTORY_PREFIX}{session}:{id}")
}

pub fn history_prefix(session: &str) -> String {
    format!("{HISTORY_PREFIX}{session}:")
}

pub fn errors_key(session: &str, id: &str) -> String {
    format!("{ERRORS_PREFIX}{session}:{id}")
}

pub fn errors_prefix(session: &str) -> String {
    format!("{ERRORS_PREFIX}{session}:")
}

pub fn daily_stats_key(session: &str, date: NaiveDate) -> String {
    format!("{DAILY_STATS_PREFIX}{session}:{}", date.format("%Y-%m-%d"))
}

/// Split a daily stats key into `(session, date)`
pub fn parse_daily_stats_key(key: &str) -> Option<(&str, NaiveDate)> {
    let rest = key.strip_prefix(DAILY_STATS_PREFIX)?;
    let (session, date) = rest.rsplit_once(':')?;
    let date = NaiveDate::parse_from_str(date, "%Y-%m-%d").ok()?;
    if session.is_empty() {
        return None;
    }
    Some((session, date))
}
