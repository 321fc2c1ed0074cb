//! Independent per-user sessions.
//!
//! A host serving several users concurrently gives each one its own
//! `ContextManager`; nothing is shared between sessions.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::context::ContextManager;

/// Identifier of a user session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub Uuid);

impl SessionId {
    pub fn new() -> Self {
        SessionId(Uuid::new_v4())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Owns one `ContextManager` per live session.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: Mutex<HashMap<SessionId, Arc<ContextManager>>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<SessionId, Arc<ContextManager>>> {
        self.sessions.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Open a fresh session with empty history.
    pub fn create(&self) -> (SessionId, Arc<ContextManager>) {
        let id = SessionId::new();
        let ctx = Arc::new(ContextManager::new());
        self.lock().insert(id, Arc::clone(&ctx));
        tracing::debug!(session_id = %id, "session created");
        (id, ctx)
    }

    pub fn get(&self, id: SessionId) -> Option<Arc<ContextManager>> {
        self.lock().get(&id).cloned()
    }

    /// Drop a session. Outstanding `Arc`s keep its data alive until released.
    pub fn remove(&self, id: SessionId) -> Option<Arc<ContextManager>> {
        self.lock().remove(&id)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}
