//! Per-show mutex registry.
//!
//! Every mutation touching a (show, seat) tuple must run while holding
//! the show's mutex, which serializes all state transitions per show.
//! The registry is process-local; cross-process coordination relies on
//! the stores' conditional-update guarantees.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio::sync::{Mutex as ShowMutex, OwnedMutexGuard};
use uuid::Uuid;

/// Process-wide map from show ID to its mutex.
///
/// Clones share the same underlying map, so the engine and the reaper
/// contend on the same per-show mutexes. Entries are created lazily and
/// never removed: shows are finite and long-lived, and a dormant entry
/// costs a few dozen bytes.
#[derive(Debug, Clone, Default)]
pub struct ShowLockRegistry {
    locks: Arc<Mutex<HashMap<Uuid, Arc<ShowMutex<()>>>>>,
}

impl ShowLockRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquires the mutex for `show_id`, creating it on first use.
    ///
    /// Waiting on one show never blocks callers of a different show: the
    /// inner guard mutex is held only for the map lookup/insert, never
    /// across the `await`.
    ///
    /// # Panics
    ///
    /// Panics if the guard mutex is poisoned.
    pub async fn acquire(&self, show_id: Uuid) -> OwnedMutexGuard<()> {
        let entry = {
            let mut locks = self.locks.lock().unwrap();
            Arc::clone(locks.entry(show_id).or_default())
        };
        entry.lock_owned().await
    }

    /// Number of registered shows (diagnostics).
    ///
    /// # Panics
    ///
    /// Panics if the guard mutex is poisoned.
    #[must_use]
    pub fn len(&self) -> usize {
        self.locks.lock().unwrap().len()
    }

    /// Whether no show has been locked yet.
    ///
    /// # Panics
    ///
    /// Panics if the guard mutex is poisoned.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.locks.lock().unwrap().is_empty()
    }
}
