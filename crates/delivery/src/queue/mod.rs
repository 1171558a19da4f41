//! Queue item model and persisted key layout

mod item;
pub mod keys;

pub use item::{ItemStatus, QueueItem};
pub use keys::{validate_session_name, SessionNameError};
