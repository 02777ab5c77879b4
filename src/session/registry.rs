//! Console sessions keyed by display name.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use tracing::debug;

use super::SharedSession;
use crate::error::ConsoleError;
use crate::Result;

/// Thread-safe map from display name to session.
///
/// At most one session is held per display name. Installing over an existing
/// name disposes the previous session before the new one becomes visible.
pub struct SessionRegistry {
    sessions: RwLock<HashMap<String, SharedSession>>,
}

impl SessionRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
        }
    }

    /// Look up a session by display name.
    pub fn find(&self, display_name: &str) -> Result<Option<SharedSession>> {
        let sessions = self
            .sessions
            .read()
            .map_err(|_| ConsoleError::LockPoisoned)?;
        Ok(sessions.get(display_name).cloned())
    }

    /// Install `session` under its display name.
    ///
    /// A different session already registered under that name is disposed
    /// first. Its process, if still running, is left alone; only its output
    /// linkage and handles are released. Re-installing the same session is
    /// a no-op.
    pub fn install(&self, session: SharedSession) -> Result<()> {
        let mut sessions = self
            .sessions
            .write()
            .map_err(|_| ConsoleError::LockPoisoned)?;

        let name = session.display_name().to_string();
        if let Some(previous) = sessions.remove(&name) {
            if !Arc::ptr_eq(&previous, &session) {
                debug!(name = %name, old = %previous.id(), new = %session.id(), "replacing console session");
                previous.dispose();
            }
        }

        sessions.insert(name, session);
        Ok(())
    }

    /// Remove and dispose the session registered under `display_name`.
    ///
    /// Returns the removed session, or None if nothing was registered.
    pub fn remove(&self, display_name: &str) -> Result<Option<SharedSession>> {
        let mut sessions = self
            .sessions
            .write()
            .map_err(|_| ConsoleError::LockPoisoned)?;

        let removed = sessions.remove(display_name);
        if let Some(session) = &removed {
            session.dispose();
        }
        Ok(removed)
    }

    /// Snapshot of all registered sessions.
    ///
    /// The snapshot is detached from the registry and can be iterated any
    /// number of times.
    pub fn all(&self) -> Result<Vec<SharedSession>> {
        let sessions = self
            .sessions
            .read()
            .map_err(|_| ConsoleError::LockPoisoned)?;
        Ok(sessions.values().cloned().collect())
    }

    /// Get the number of registered sessions.
    pub fn count(&self) -> usize {
        self.sessions.read().map(|s| s.len()).unwrap_or(0)
    }

    /// Remove and dispose all sessions matching a predicate.
    ///
    /// Returns the number of sessions removed.
    pub fn remove_matching<F>(&self, predicate: F) -> Result<usize>
    where
        F: Fn(&SharedSession) -> bool,
    {
        let mut sessions = self
            .sessions
            .write()
            .map_err(|_| ConsoleError::LockPoisoned)?;

        let before = sessions.len();
        sessions.retain(|_, session| {
            if predicate(session) {
                session.dispose();
                false
            } else {
                true
            }
        });
        Ok(before - sessions.len())
    }
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new()
    }
}
