//! Bounded per-process memo.
//!
//! Holds hot answers (display decisions, freshness markers) for the lifetime
//! of a worker. Least-recently-used entries are evicted at capacity; an
//! optional max age bounds how long a stale answer can survive.

use lru::LruCache;
use sharedhelp_core::{Clock, Timestamp};
use std::hash::Hash;
use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

struct Slot<V> {
    value: V,
    inserted_at: Timestamp,
}

/// LRU memo with optional entry age limit.
pub struct BoundedMemo<K: Hash + Eq, V: Clone> {
    entries: Mutex<LruCache<K, Slot<V>>>,
    max_age: Option<chrono::Duration>,
    clock: Arc<dyn Clock>,
}

impl<K: Hash + Eq, V: Clone> BoundedMemo<K, V> {
    /// Memo holding at most `capacity` entries (at least one).
    pub fn new(capacity: usize, clock: Arc<dyn Clock>) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
            max_age: None,
            clock,
        }
    }

    /// Entries older than `max_age` are treated as absent.
    pub fn with_max_age(mut self, max_age: Duration) -> Self {
        self.max_age = chrono::Duration::from_std(max_age).ok();
        self
    }

    // A poisoned lock only means another thread panicked mid-update; the
    // LRU itself is still structurally valid.
    fn lock(&self) -> MutexGuard<'_, LruCache<K, Slot<V>>> {
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn get(&self, key: &K) -> Option<V> {
        let now = self.clock.now();
        let mut entries = self.lock();
        let expired = match entries.get(key) {
            Some(slot) => match self.max_age {
                Some(max_age) if now - slot.inserted_at >= max_age => true,
                _ => return Some(slot.value.clone()),
            },
            None => return None,
        };
        if expired {
            entries.pop(key);
        }
        None
    }

    pub fn insert(&self, key: K, value: V) {
        let inserted_at = self.clock.now();
        self.lock().put(key, Slot { value, inserted_at });
    }

    pub fn remove(&self, key: &K) -> Option<V> {
        self.lock().pop(key).map(|slot| slot.value)
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}
