//! Serializes guest cart read-modify-write cycles per session.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

#[derive(Default)]
pub struct SessionLocks {
    sessions: Mutex<HashMap<String, Arc<AsyncMutex<()>>>>,
}

/// Holds a session exclusively until dropped.
pub struct SessionLockGuard<'a> {
    owner: &'a SessionLocks,
    session_id: String,
    lock: Arc<AsyncMutex<()>>,
    held: Option<OwnedMutexGuard<()>>,
}

impl SessionLocks {
    pub fn new() -> Self {
        Self::default()
    }

    fn sessions(&self) -> MutexGuard<'_, HashMap<String, Arc<AsyncMutex<()>>>> {
        self.sessions.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Waits until no other holder has `session_id`.
    pub async fn acquire(&self, session_id: &str) -> SessionLockGuard<'_> {
        let lock = Arc::clone(
            self.sessions()
                .entry(session_id.to_string())
                .or_insert_with(|| Arc::new(AsyncMutex::new(()))),
        );
        let held = Arc::clone(&lock).lock_owned().await;
        SessionLockGuard { owner: self, session_id: session_id.to_string(), lock, held: Some(held) }
    }

    /// Number of sessions currently held or waited on.
    pub fn active(&self) -> usize {
        self.sessions().len()
    }
}

impl Drop for SessionLockGuard<'_> {
    fn drop(&mut self) {
        self.held.take();
        let mut sessions = self.owner.sessions();
        // Only the map and this guard still reference the lock: nobody is waiting.
        if Arc::strong_count(&self.lock) == 2 {
            sessions.remove(&self.session_id);
        }
    }
}
