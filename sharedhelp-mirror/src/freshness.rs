//! Authority revision markers.
//!
//! The marker of a page is part of every render key, so this is what bounds
//! staleness: once the cached marker expires and the new one is read, the
//! next render lookup lands on a fresh key.

use sharedhelp_core::{CacheKey, CachedMarker, Clock, FreshnessMarker, Title};
use sharedhelp_remote::TouchedStore;
use sharedhelp_storage::{get_json, set_json, BoundedMemo, CacheStore};
use std::sync::Arc;
use std::time::Duration;

/// Resolves and caches the authority's last-modified marker for a page.
///
/// Two layers: a bounded in-process memo in front of the shared store.
/// The memo holds only markers read from the authority by this process, so
/// no layer serves a marker older than the freshness TTL.
pub struct FreshnessOracle {
    touched: Arc<dyn TouchedStore>,
    store: Arc<dyn CacheStore>,
    memo: BoundedMemo<String, FreshnessMarker>,
    ttl: Duration,
    failure_ttl: Duration,
}

impl FreshnessOracle {
    /// `ttl` bounds how long an old marker is served; `failure_ttl` is how
    /// long a failed lookup is remembered as absent.
    pub fn new(
        touched: Arc<dyn TouchedStore>,
        store: Arc<dyn CacheStore>,
        clock: Arc<dyn Clock>,
        memo_capacity: usize,
        ttl: Duration,
        failure_ttl: Duration,
    ) -> Self {
        Self {
            touched,
            store,
            memo: BoundedMemo::new(memo_capacity, clock).with_max_age(ttl),
            ttl,
            failure_ttl,
        }
    }

    /// Current marker of `title` on the authority.
    ///
    /// `None` means the page does not exist or the lookup failed; either way
    /// the page cannot be mirrored right now.
    pub async fn resolve(&self, title: &Title) -> Option<FreshnessMarker> {
        let memo_key = title.prefixed_db_key();
        if let Some(marker) = self.memo.get(&memo_key) {
            return Some(marker);
        }

        let key = CacheKey::touched(title);
        match get_json::<CachedMarker>(self.store.as_ref(), &key).await {
            Ok(Some(cached)) => return cached.marker,
            Ok(None) => {}
            Err(e) => tracing::warn!(page = %title, error = %e, "Freshness cache read failed"),
        }

        let (marker, ttl) = match self.touched.touched(title).await {
            Ok(marker) => {
                if let Some(marker) = &marker {
                    self.memo.insert(memo_key, marker.clone());
                }
                (marker, self.ttl)
            }
            Err(e) => {
                tracing::warn!(page = %title, error = %e, "Freshness lookup failed");
                (None, self.failure_ttl)
            }
        };

        let cached = CachedMarker {
            marker: marker.clone(),
        };
        if let Err(e) = set_json(self.store.as_ref(), &key, &cached, Some(ttl)).await {
            tracing::warn!(page = %title, error = %e, "Failed to cache freshness marker");
        }
        marker
    }

    /// Forget the marker of `title` in both layers.
    pub async fn invalidate(&self, title: &Title) {
        self.memo.remove(&title.prefixed_db_key());
        if let Err(e) = self.store.delete(&CacheKey::touched(title)).await {
            tracing::warn!(page = %title, error = %e, "Failed to drop freshness marker");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MapTouched;
    use sharedhelp_test_utils::ManualClock;
    use sharedhelp_storage::InMemoryCacheStore;

    fn oracle(touched: Arc<MapTouched>, clock: Arc<ManualClock>) -> FreshnessOracle {
        let store = Arc::new(InMemoryCacheStore::new(clock.clone()));
        FreshnessOracle::new(
            touched,
            store,
            clock,
            100,
            Duration::from_secs(30),
            Duration::from_secs(10),
        )
    }

    #[tokio::test]
    async fn test_marker_cached_for_ttl() {
        let clock = ManualClock::new();
        let touched = MapTouched::with("Help:Editing", "v1");
        let oracle = oracle(touched.clone(), clock.clone());
        let title = Title::help("Editing").unwrap();

        assert_eq!(oracle.resolve(&title).await, Some(FreshnessMarker::new("v1")));
        touched.set("Help:Editing", "v2");
        clock.advance_secs(29);
        assert_eq!(oracle.resolve(&title).await, Some(FreshnessMarker::new("v1")));
        assert_eq!(touched.calls(), 1);

        clock.advance_secs(1);
        assert_eq!(oracle.resolve(&title).await, Some(FreshnessMarker::new("v2")));
        assert_eq!(touched.calls(), 2);
    }

    #[tokio::test]
    async fn test_missing_page_is_absent_and_cached() {
        let clock = ManualClock::new();
        let touched = Arc::new(MapTouched::default());
        let oracle = oracle(touched.clone(), clock);
        let title = Title::help("Nope").unwrap();

        assert_eq!(oracle.resolve(&title).await, None);
        assert_eq!(oracle.resolve(&title).await, None);
        assert_eq!(touched.calls(), 1);
    }

    #[tokio::test]
    async fn test_failure_degrades_to_absent_briefly() {
        let clock = ManualClock::new();
        let touched = Arc::new(MapTouched::default());
        touched.fail("Help:Editing");
        let oracle = oracle(touched.clone(), clock.clone());
        let title = Title::help("Editing").unwrap();

        assert_eq!(oracle.resolve(&title).await, None);
        assert_eq!(oracle.resolve(&title).await, None);
        assert_eq!(touched.calls(), 1);

        touched.set("Help:Editing", "v1");
        clock.advance_secs(10);
        assert_eq!(oracle.resolve(&title).await, Some(FreshnessMarker::new("v1")));
    }

    #[tokio::test]
    async fn test_invalidate() {
        let clock = ManualClock::new();
        let touched = MapTouched::with("Help:Editing", "v1");
        let oracle = oracle(touched.clone(), clock);
        let title = Title::help("Editing").unwrap();

        oracle.resolve(&title).await;
        touched.set("Help:Editing", "v2");
        oracle.invalidate(&title).await;
        assert_eq!(oracle.resolve(&title).await, Some(FreshnessMarker::new("v2")));
    }
}
