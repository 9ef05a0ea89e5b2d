//! Per-key async locks.
//!
//! The map only holds weak references: an entry lives as long as some task
//! holds or waits on its guard, and dead entries are pruned as the map grows.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::{Arc, Mutex, PoisonError, Weak};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

/// Prune dead entries once the map holds more than this many keys.
const PRUNE_THRESHOLD: usize = 64;

/// A set of async mutexes addressed by key.
#[derive(Debug)]
pub struct KeyedLocks<K> {
    entries: Mutex<HashMap<K, Weak<AsyncMutex<()>>>>,
}

impl<K> Default for KeyedLocks<K> {
    fn default() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
        }
    }
}

impl<K: Eq + Hash + Clone> KeyedLocks<K> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to `key`.
    ///
    /// The guard releases the lock when dropped.
    pub async fn lock(&self, key: &K) -> OwnedMutexGuard<()> {
        let mutex = self.mutex_for(key);
        mutex.lock_owned().await
    }

    /// Number of keys with a live lock.
    #[must_use]
    pub fn active(&self) -> usize {
        let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.values().filter(|w| w.strong_count() > 0).count()
    }

    fn mutex_for(&self, key: &K) -> Arc<AsyncMutex<()>> {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);

        if let Some(existing) = entries.get(key).and_then(Weak::upgrade) {
            return existing;
        }

        if entries.len() >= PRUNE_THRESHOLD {
            entries.retain(|_, w| w.strong_count() > 0);
        }

        let mutex = Arc::new(AsyncMutex::new(()));
        entries.insert(key.clone(), Arc::downgrade(&mutex));
        mutex
    }
}
