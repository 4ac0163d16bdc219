use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use super::model::Session;
use crate::identity::Address;

/// Identity-keyed cache of constructed sessions.
///
/// Owned by the composition root and handed to the
/// [`SessionManager`](super::SessionManager), which is its only writer.
/// Keeping ready clients here means a remount or an identity switch back
/// never prompts the wallet again.
#[derive(Default)]
pub struct SessionStore {
    sessions: RwLock<HashMap<Address, Arc<Session>>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Gets a cached session by identity.
    pub fn get(&self, identity: &Address) -> Option<Arc<Session>> {
        let sessions = self.sessions.read().unwrap_or_else(|e| e.into_inner());
        sessions.get(identity).cloned()
    }

    /// Inserts `session` unless one already exists for its identity.
    ///
    /// Returns the session that ends up cached.
    pub(crate) fn get_or_insert(&self, session: Arc<Session>) -> Arc<Session> {
        let mut sessions = self.sessions.write().unwrap_or_else(|e| e.into_inner());
        sessions
            .entry(session.identity.clone())
            .or_insert(session)
            .clone()
    }

    /// Caches `session`, replacing any session for the same identity.
    pub(crate) fn replace(&self, session: Arc<Session>) -> Option<Arc<Session>> {
        let mut sessions = self.sessions.write().unwrap_or_else(|e| e.into_inner());
        sessions.insert(session.identity.clone(), session)
    }

    /// Removes a session from the cache.
    pub(crate) fn remove(&self, identity: &Address) -> Option<Arc<Session>> {
        let mut sessions = self.sessions.write().unwrap_or_else(|e| e.into_inner());
        sessions.remove(identity)
    }

    pub fn contains(&self, identity: &Address) -> bool {
        self.get(identity).is_some()
    }

    pub fn len(&self) -> usize {
        self.sessions.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
