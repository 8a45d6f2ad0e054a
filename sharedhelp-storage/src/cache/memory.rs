//! In-memory cache store.
//!
//! Expiry is lazy: an entry past its deadline is dropped the next time it is
//! read.

use async_trait::async_trait;
use sharedhelp_core::{Clock, StoreError, SystemClock, Timestamp};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use super::traits::{CacheStats, CacheStore};

#[derive(Debug, Clone)]
struct Entry {
    value: Vec<u8>,
    expires_at: Option<Timestamp>,
}

impl Entry {
    fn is_expired(&self, now: Timestamp) -> bool {
        self.expires_at.is_some_and(|deadline| now >= deadline)
    }
}

/// Process-local [`CacheStore`] backed by a hash map.
///
/// Suitable for tests and single-process deployments. TTLs are measured
/// against the injected [`Clock`].
pub struct InMemoryCacheStore {
    entries: tokio::sync::RwLock<HashMap<String, Entry>>,
    clock: Arc<dyn Clock>,
    hits: AtomicU64,
    misses: AtomicU64,
    expirations: AtomicU64,
}

impl Default for InMemoryCacheStore {
    fn default() -> Self {
        Self::new(Arc::new(SystemClock))
    }
}

impl std::fmt::Debug for InMemoryCacheStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryCacheStore")
            .field("hits", &self.hits.load(Ordering::Relaxed))
            .field("misses", &self.misses.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

impl InMemoryCacheStore {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: tokio::sync::RwLock::new(HashMap::new()),
            clock,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            expirations: AtomicU64::new(0),
        }
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    fn deadline(&self, ttl: Option<Duration>) -> Result<Option<Timestamp>, StoreError> {
        let Some(ttl) = ttl else {
            return Ok(None);
        };
        let ttl = chrono::Duration::from_std(ttl).map_err(|e| StoreError::Backend {
            reason: format!("TTL out of range: {}", e),
        })?;
        Ok(Some(self.clock.now() + ttl))
    }
}

#[async_trait]
impl CacheStore for InMemoryCacheStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        let now = self.clock.now();
        {
            let entries = self.entries.read().await;
            match entries.get(key) {
                Some(entry) if !entry.is_expired(now) => {
                    self.hits.fetch_add(1, Ordering::Relaxed);
                    return Ok(Some(entry.value.clone()));
                }
                Some(_) => {}
                None => {
                    self.misses.fetch_add(1, Ordering::Relaxed);
                    return Ok(None);
                }
            }
        }

        // Expired: re-check under the write lock, a concurrent set may have
        // replaced it.
        let mut entries = self.entries.write().await;
        if let Some(entry) = entries.get(key) {
            if !entry.is_expired(now) {
                self.hits.fetch_add(1, Ordering::Relaxed);
                return Ok(Some(entry.value.clone()));
            }
            entries.remove(key);
            self.expirations.fetch_add(1, Ordering::Relaxed);
            tracing::trace!(key, "Cache entry expired");
        }
        self.misses.fetch_add(1, Ordering::Relaxed);
        Ok(None)
    }

    async fn set(
        &self,
        key: &str,
        value: Vec<u8>,
        ttl: Option<Duration>,
    ) -> Result<(), StoreError> {
        let expires_at = self.deadline(ttl)?;
        let mut entries = self.entries.write().await;
        entries.insert(key.to_string(), Entry { value, expires_at });
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        self.entries.write().await.remove(key);
        Ok(())
    }

    async fn stats(&self) -> Result<CacheStats, StoreError> {
        let entry_count = self.entries.read().await.len() as u64;
        Ok(CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            entry_count,
            expirations: self.expirations.load(Ordering::Relaxed),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::traits::{get_json, set_json};
    use sharedhelp_test_utils::ManualClock;

    #[tokio::test]
    async fn test_set_get_delete() {
        let store = InMemoryCacheStore::default();
        store.set("k", b"v".to_vec(), None).await.unwrap();
        assert_eq!(store.get("k").await.unwrap(), Some(b"v".to_vec()));

        store.delete("k").await.unwrap();
        assert_eq!(store.get("k").await.unwrap(), None);

        // Deleting again is fine.
        store.delete("k").await.unwrap();
    }

    #[tokio::test]
    async fn test_ttl_expiry() {
        let clock = ManualClock::new();
        let store = InMemoryCacheStore::new(clock.clone());
        store
            .set("k", b"v".to_vec(), Some(Duration::from_secs(10)))
            .await
            .unwrap();

        clock.advance_secs(9);
        assert!(store.get("k").await.unwrap().is_some());

        clock.advance_secs(1);
        assert!(store.get("k").await.unwrap().is_none());
        assert!(store.is_empty().await);

        let stats = store.stats().await.unwrap();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.expirations, 1);
    }

    #[tokio::test]
    async fn test_no_ttl_never_expires() {
        let clock = ManualClock::new();
        let store = InMemoryCacheStore::new(clock.clone());
        store.set("k", b"v".to_vec(), None).await.unwrap();
        clock.advance_secs(365 * 86_400);
        assert!(store.get("k").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_json_helpers() {
        let store = InMemoryCacheStore::default();
        set_json(&store, "pair", &vec!["Project", "Project_talk"], None)
            .await
            .unwrap();
        let back: Option<Vec<String>> = get_json(&store, "pair").await.unwrap();
        assert_eq!(back, Some(vec!["Project".to_string(), "Project_talk".to_string()]));

        store.set("bad", b"not json".to_vec(), None).await.unwrap();
        let err = get_json::<Vec<String>>(&store, "bad").await.unwrap_err();
        assert!(matches!(err, StoreError::Serialization { .. }));
    }
}
