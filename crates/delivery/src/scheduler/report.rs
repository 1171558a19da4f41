//! Tick results

use serde::Serialize;

/// What happened to one session during a tick
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum SessionOutcome {
    /// Queue had nothing deliverable
    Idle,

    /// A delivery for this session was already in flight
    Busy,

    /// Session exists but is not authenticated yet
    NotReady,

    /// Session no longer exists; its queue was dropped
    Orphaned { purged: usize },

    /// Head item delivered
    Delivered { item_id: String },

    /// Head item failed transiently and was re-queued at the tail
    Retrying { item_id: String, retry_count: u32 },

    /// Head item failed for good
    Failed {
        item_id: String,
        permanent: bool,
        retry_count: u32,
    },

    /// The store failed mid-tick; the item stays where it was
    StoreError { message: String },

    /// Session handling panicked
    Panicked,
}

/// One session's entry in a [`TickReport`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionTick {
    pub session: String,
    #[serde(flatten)]
    pub outcome: SessionOutcome,
}

/// Result of one scheduling pass
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TickReport {
    /// The pass was skipped because another one was still scanning
    pub skipped: bool,
    pub sessions: Vec<SessionTick>,
}

impl TickReport {
    pub(crate) fn skipped() -> Self {
        Self {
            skipped: true,
            sessions: vec![],
        }
    }

    /// Outcome for a session, if it had a queue this tick
    pub fn outcome_for(&self, session: &str) -> Option<&SessionOutcome> {
        self.sessions
            .iter()
            .find(|s| s.session == session)
            .map(|s| &s.outcome)
    }

    /// Number of items delivered in this pass
    pub fn delivered(&self) -> usize {
        self.sessions
            .iter()
            .filter(|s| matches!(s.outcome, SessionOutcome::Delivered { .. }))
            .count()
    }
}
