//! Session registry
//!
//! Sessions (one per messaging account) are owned by the embedding
//! application. The delivery layer only consults them: a queue whose session
//! cannot be looked up is an orphan and gets purged, a session that is not yet
//! authenticated is skipped until it is.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tracing::info;

/// Live session state handed to the transport
#[derive(Clone)]
pub struct SessionHandle {
    name: String,
    authenticated: bool,
    context: Option<Arc<dyn Any + Send + Sync>>,
}

impl SessionHandle {
    /// Create an unauthenticated handle with no transport context
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            authenticated: false,
            context: None,
        }
    }

    /// Set the authenticated flag
    pub fn with_authenticated(mut self, authenticated: bool) -> Self {
        self.authenticated = authenticated;
        self
    }

    /// Attach an opaque transport context (e.g. a browser page handle)
    pub fn with_context<T: Any + Send + Sync>(mut self, context: T) -> Self {
        self.context = Some(Arc::new(context));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether the session can deliver messages right now
    pub fn is_ready(&self) -> bool {
        self.authenticated
    }

    /// Downcast the transport context
    pub fn context<T: Any + Send + Sync>(&self) -> Option<&T> {
        self.context.as_ref()?.downcast_ref::<T>()
    }
}

impl fmt::Debug for SessionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionHandle")
            .field("name", &self.name)
            .field("authenticated", &self.authenticated)
            .field("has_context", &self.context.is_some())
            .finish()
    }
}

/// Read-only view of live sessions
pub trait SessionRegistry: Send + Sync {
    /// Find a live session by name
    fn lookup(&self, name: &str) -> Option<SessionHandle>;
}

/// Summary of a registered session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct SessionInfo {
    pub name: String,
    pub authenticated: bool,
}

/// Concurrent in-memory registry
#[derive(Default)]
pub struct InMemorySessionRegistry {
    sessions: DashMap<String, SessionHandle>,
}

impl InMemorySessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a session
    pub fn register(&self, handle: SessionHandle) {
        info!(session = %handle.name, authenticated = handle.authenticated, "Session registered");
        self.sessions.insert(handle.name.clone(), handle);
    }

    /// Remove a session, returning its handle if it was registered
    pub fn remove(&self, name: &str) -> Option<SessionHandle> {
        let removed = self.sessions.remove(name).map(|(_, handle)| handle);
        if removed.is_some() {
            info!(session = %name, "Session removed");
        }
        removed
    }

    /// Flip the authenticated flag; returns `false` for unknown sessions
    pub fn set_authenticated(&self, name: &str, authenticated: bool) -> bool {
        match self.sessions.get_mut(name) {
            Some(mut handle) => {
                handle.authenticated = authenticated;
                true
            }
            None => false,
        }
    }

    /// All sessions, sorted by name
    pub fn list(&self) -> Vec<SessionInfo> {
        let mut sessions: Vec<SessionInfo> = self
            .sessions
            .iter()
            .map(|entry| SessionInfo {
                name: entry.name.clone(),
                authenticated: entry.authenticated,
            })
            .collect();
        sessions.sort_by(|a, b| a.name.cmp(&b.name));
        sessions
    }
}

impl SessionRegistry for InMemorySessionRegistry {
    fn lookup(&self, name: &str) -> Option<SessionHandle> {
        self.sessions.get(name).map(|entry| entry.value().clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_and_lookup() {
        let registry = InMemorySessionRegistry::new();
        assert!(registry.lookup("a").is_none());

        registry.register(SessionHandle::new("a").with_authenticated(true));
        let handle = registry.lookup("a").unwrap();
        assert_eq!(handle.name(), "a");
        assert!(handle.is_ready());
    }

    #[test]
    fn test_set_authenticated() {
        let registry = InMemorySessionRegistry::new();
        registry.register(SessionHandle::new("a"));
        assert!(!registry.lookup("a").unwrap().is_ready());

        assert!(registry.set_authenticated("a", true));
        assert!(registry.lookup("a").unwrap().is_ready());
        assert!(!registry.set_authenticated("missing", true));
    }

    #[test]
    fn test_remove_and_list() {
        let registry = InMemorySessionRegistry::new();
        registry.register(SessionHandle::new("b").with_authenticated(true));
        registry.register(SessionHandle::new("a"));

        let names: Vec<String> = registry.list().into_iter().map(|s| s.name).collect();
        assert_eq!(names, vec!["a", "b"]);

        assert!(registry.remove("a").is_some());
        assert!(registry.remove("a").is_none());
        assert_eq!(registry.list().len(), 1);
    }

    #[test]
    fn test_context_downcast() {
        #[derive(Debug, PartialEq)]
        struct Page(u32);

        let handle = SessionHandle::new("a").with_context(Page(7));
        assert_eq!(handle.context::<Page>(), Some(&Page(7)));
        assert!(handle.context::<String>().is_none());
        assert!(SessionHandle::new("b").context::<Page>().is_none());
    }
}
