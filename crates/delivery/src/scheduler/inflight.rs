//! Per-session in-flight tracking
//!
//! At most one delivery per session may be outstanding. A session is marked
//! by an atomic insert into a concurrent set; the returned guard unmarks it
//! on drop, so the flag is cleared exactly once even when the attempt panics
//! or is cancelled.

use std::sync::Arc;

use dashmap::DashSet;

/// Sessions with a delivery in flight
#[derive(Debug, Default)]
pub struct InFlightSet {
    sessions: DashSet<String>,
}

impl InFlightSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark `session` as in flight
    ///
    /// Returns `None` if it already is.
    pub fn try_acquire(self: &Arc<Self>, session: &str) -> Option<InFlightGuard> {
        if self.sessions.insert(session.to_string()) {
            Some(InFlightGuard {
                set: Arc::clone(self),
                session: session.to_string(),
            })
        } else {
            None
        }
    }

    pub fn contains(&self, session: &str) -> bool {
        self.sessions.contains(session)
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

/// Clears the in-flight mark when dropped
#[derive(Debug)]
pub struct InFlightGuard {
    set: Arc<InFlightSet>,
    session: String,
}

impl InFlightGuard {
    pub fn session(&self) -> &str {
        &self.session
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.set.sessions.remove(&self.session);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exclusive_per_session() {
        let set = Arc::new(InFlightSet::new());

        let guard = set.try_acquire("a").unwrap();
        assert_eq!(guard.session(), "a");
        assert!(set.try_acquire("a").is_none());
        assert!(set.contains("a"));

        // other sessions are independent
        let other = set.try_acquire("b");
        assert!(other.is_some());
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_released_on_drop() {
        let set = Arc::new(InFlightSet::new());
        {
            let _guard = set.try_acquire("a").unwrap();
        }
        assert!(!set.contains("a"));
        assert!(set.is_empty());
        assert!(set.try_acquire("a").is_some());
    }

    #[test]
    fn test_released_on_panic() {
        let set = Arc::new(InFlightSet::new());
        let cloned = Arc::clone(&set);

        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(move || {
            let _guard = cloned.try_acquire("a").unwrap();
            panic!("delivery blew up");
        }));

        assert!(result.is_err());
        assert!(!set.contains("a"));
    }
}
