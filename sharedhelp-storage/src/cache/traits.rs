//! Cache store trait and typed helpers.

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use sharedhelp_core::StoreError;
use std::time::Duration;

/// Key-value cache store with per-entry TTL.
///
/// This abstracts over memcached-style backends. Implementations must be
/// thread-safe; no compare-and-swap or multi-key atomicity is assumed.
///
/// A `ttl` of `None` means "no expiry" (the backend may still evict).
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Get the raw value stored under `key`, or `None` if absent or expired.
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError>;

    /// Store `value` under `key`, replacing any previous value.
    async fn set(&self, key: &str, value: Vec<u8>, ttl: Option<Duration>)
        -> Result<(), StoreError>;

    /// Remove `key`. Deleting an absent key is not an error.
    async fn delete(&self, key: &str) -> Result<(), StoreError>;

    /// Get cache statistics.
    async fn stats(&self) -> Result<CacheStats, StoreError>;
}

/// Statistics about cache usage.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Number of cache hits.
    pub hits: u64,
    /// Number of cache misses (including expired entries).
    pub misses: u64,
    /// Number of entries currently stored.
    pub entry_count: u64,
    /// Number of entries dropped because their TTL ran out.
    pub expirations: u64,
}

impl CacheStats {
    /// Calculate the hit rate (0.0 to 1.0).
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

/// Read and deserialize a JSON value.
///
/// A value that no longer deserializes (schema drift) is reported as a
/// serialization error, not as a miss, so callers can decide.
pub async fn get_json<T: DeserializeOwned>(
    store: &dyn CacheStore,
    key: &str,
) -> Result<Option<T>, StoreError> {
    match store.get(key).await? {
        Some(bytes) => serde_json::from_slice(&bytes)
            .map(Some)
            .map_err(|e| StoreError::Serialization {
                reason: e.to_string(),
            }),
        None => Ok(None),
    }
}

/// Serialize a value as JSON and store it.
pub async fn set_json<T: Serialize + Sync + ?Sized>(
    store: &dyn CacheStore,
    key: &str,
    value: &T,
    ttl: Option<Duration>,
) -> Result<(), StoreError> {
    let bytes = serde_json::to_vec(value).map_err(|e| StoreError::Serialization {
        reason: e.to_string(),
    })?;
    store.set(key, bytes, ttl).await
}
