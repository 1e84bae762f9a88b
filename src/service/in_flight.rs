//! Rejects a cart mutation while an identical one is still outstanding.

use std::collections::HashSet;
use std::fmt;
use std::sync::{Mutex, MutexGuard};

use crate::domain::value_objects::LineKey;
use crate::{Result, StorefrontError};

/// What an outstanding mutation is working on.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Slot {
    Account { user_id: String, key: LineKey },
    Guest { session_id: String, key: LineKey },
    Merge { session_id: String },
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Account { user_id, key } => write!(f, "user {user_id} line {key}"),
            Self::Guest { session_id, key } => write!(f, "session {session_id} line {key}"),
            Self::Merge { session_id } => write!(f, "merge for session {session_id}"),
        }
    }
}

#[derive(Default)]
pub struct InFlight {
    pending: Mutex<HashSet<Slot>>,
}

/// Releases its slot on drop.
pub struct InFlightGuard<'a> {
    owner: &'a InFlight,
    slot: Slot,
}

impl InFlight {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashSet<Slot>> {
        self.pending.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Claims `slot`, failing with [`StorefrontError::MutationInFlight`] when it is already taken.
    pub fn acquire(&self, slot: Slot) -> Result<InFlightGuard<'_>> {
        if !self.lock().insert(slot.clone()) {
            return Err(StorefrontError::MutationInFlight(slot.to_string()));
        }
        Ok(InFlightGuard { owner: self, slot })
    }

    pub fn is_pending(&self, slot: &Slot) -> bool {
        self.lock().contains(slot)
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.owner.lock().remove(&self.slot);
    }
}
