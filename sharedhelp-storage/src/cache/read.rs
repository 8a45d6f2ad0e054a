//! Cache reads that carry where the value came from.

use serde::{Deserialize, Serialize};
use sharedhelp_core::{FreshnessMarker, Timestamp};
use std::time::Duration;

/// A value as written to the store, with the time it was written.
///
/// Stored instead of the bare value so a later hit can report its age.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stamped<T> {
    pub stored_at: Timestamp,
    pub value: T,
}

impl<T> Stamped<T> {
    pub fn new(value: T, stored_at: Timestamp) -> Self {
        Self { stored_at, value }
    }
}

/// Result of a cache read, carrying staleness metadata.
///
/// Callers that only want the value use [`CacheRead::into_value`]; the
/// hit/miss flag exists for logging and tests.
#[derive(Debug, Clone)]
pub struct CacheRead<T> {
    value: T,
    /// When this value was stored (or fetched, on a miss).
    cached_at: Timestamp,
    /// Authority revision the value was keyed on.
    marker: Option<FreshnessMarker>,
    was_cache_hit: bool,
}

impl<T> CacheRead<T> {
    /// A value served from the store.
    pub fn from_cache(value: T, cached_at: Timestamp, marker: Option<FreshnessMarker>) -> Self {
        Self {
            value,
            cached_at,
            marker,
            was_cache_hit: true,
        }
    }

    /// A value fetched from the authority on a miss.
    pub fn from_fetch(value: T, fetched_at: Timestamp, marker: Option<FreshnessMarker>) -> Self {
        Self {
            value,
            cached_at: fetched_at,
            marker,
            was_cache_hit: false,
        }
    }

    /// Build a hit from a stamped store entry.
    pub fn from_stamped(stamped: Stamped<T>, marker: Option<FreshnessMarker>) -> Self {
        Self::from_cache(stamped.value, stamped.stored_at, marker)
    }

    pub fn into_value(self) -> T {
        self.value
    }

    pub fn value(&self) -> &T {
        &self.value
    }

    pub fn cached_at(&self) -> Timestamp {
        self.cached_at
    }

    pub fn marker(&self) -> Option<&FreshnessMarker> {
        self.marker.as_ref()
    }

    pub fn was_cache_hit(&self) -> bool {
        self.was_cache_hit
    }

    pub fn was_cache_miss(&self) -> bool {
        !self.was_cache_hit
    }

    /// How old the value is at `now`. Zero if `now` precedes the store time.
    pub fn staleness(&self, now: Timestamp) -> Duration {
        (now - self.cached_at).to_std().unwrap_or(Duration::ZERO)
    }

    /// Map the inner value to a new type.
    pub fn map<U, F>(self, f: F) -> CacheRead<U>
    where
        F: FnOnce(T) -> U,
    {
        CacheRead {
            value: f(self.value),
            cached_at: self.cached_at,
            marker: self.marker,
            was_cache_hit: self.was_cache_hit,
        }
    }
}

impl<T> AsRef<T> for CacheRead<T> {
    fn as_ref(&self) -> &T {
        &self.value
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn at(secs: i64) -> Timestamp {
        Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
    }

    #[test]
    fn test_hit_and_miss_flags() {
        let hit = CacheRead::from_cache(1, at(0), None);
        assert!(hit.was_cache_hit());
        assert!(!hit.was_cache_miss());

        let miss = CacheRead::from_fetch(1, at(0), Some(FreshnessMarker::new("v1")));
        assert!(miss.was_cache_miss());
        assert_eq!(miss.marker(), Some(&FreshnessMarker::new("v1")));
    }

    #[test]
    fn test_staleness() {
        let read = CacheRead::from_cache("x", at(0), None);
        assert_eq!(read.staleness(at(30)), Duration::from_secs(30));
        assert_eq!(read.staleness(at(-5)), Duration::ZERO);
    }

    #[test]
    fn test_from_stamped_keeps_store_time() {
        let read = CacheRead::from_stamped(Stamped::new("html", at(7)), None);
        assert!(read.was_cache_hit());
        assert_eq!(read.cached_at(), at(7));
        assert_eq!(read.into_value(), "html");
    }

    #[test]
    fn test_map_preserves_metadata() {
        let read = CacheRead::from_cache(21, at(3), Some(FreshnessMarker::new("m")));
        let doubled = read.map(|v| v * 2);
        assert_eq!(*doubled.value(), 42);
        assert!(doubled.was_cache_hit());
        assert_eq!(doubled.cached_at(), at(3));
    }
}
