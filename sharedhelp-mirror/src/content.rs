//! Keyed render cache with negative entries.
//!
//! Keys embed the authority's freshness marker, so an edit on the authority
//! moves readers to a new key instead of invalidating the old one. Failed
//! fetches are remembered for a short window so a failing authority is not
//! asked again on every page view.

use sharedhelp_core::{
    CacheKey, CachedRender, Clock, FreshnessMarker, RenderResult, Timestamp, Title,
};
use sharedhelp_storage::{get_json, set_json, CacheRead, CacheStore, Stamped};
use std::sync::Arc;
use std::time::Duration;

use crate::RenderSource;

/// Outcome of looking a key up in the store.
enum Lookup {
    Hit(CacheRead<RenderResult>),
    Negative,
    Miss,
}

pub struct ContentCache {
    source: Arc<dyn RenderSource>,
    store: Arc<dyn CacheStore>,
    clock: Arc<dyn Clock>,
    content_ttl: Duration,
    negative_ttl: Duration,
}

impl ContentCache {
    pub fn new(
        source: Arc<dyn RenderSource>,
        store: Arc<dyn CacheStore>,
        clock: Arc<dyn Clock>,
        content_ttl: Duration,
        negative_ttl: Duration,
    ) -> Self {
        Self {
            source,
            store,
            clock,
            content_ttl,
            negative_ttl,
        }
    }

    /// Rendered `title` in `locale` at revision `marker`, or `None` when the
    /// authority could not supply it (now or within the negative window).
    ///
    /// A miss performs exactly one upstream fetch. Concurrent misses on the
    /// same key each fetch; the last write wins.
    pub async fn get_or_fetch(
        &self,
        title: &Title,
        locale: &str,
        marker: Option<&FreshnessMarker>,
    ) -> Option<CacheRead<RenderResult>> {
        let key = CacheKey::render(title, locale, marker).encode();

        match self.lookup(&key, title, marker).await {
            Lookup::Hit(read) => {
                tracing::debug!(page = %title, locale, "Render cache hit");
                return Some(read);
            }
            Lookup::Negative => {
                tracing::debug!(page = %title, locale, "Render cache negative hit");
                return None;
            }
            Lookup::Miss => {
                tracing::debug!(page = %title, locale, "Render cache miss");
            }
        }

        let now = self.clock.now();
        match self.source.fetch(title, locale).await {
            Ok(result) if result.is_usable() => {
                let entry = Stamped::new(
                    CachedRender::Rendered {
                        result: result.clone(),
                    },
                    now,
                );
                self.store_entry(&key, title, &entry, self.content_ttl).await;
                Some(CacheRead::from_fetch(result, now, marker.cloned()))
            }
            Ok(_) => {
                tracing::warn!(page = %title, locale, "Authority returned empty content");
                self.store_negative(&key, title, now).await;
                None
            }
            Err(e) => {
                tracing::warn!(page = %title, locale, error = %e, "Remote render failed");
                self.store_negative(&key, title, now).await;
                None
            }
        }
    }

    /// Delete the entry for one exact key.
    pub async fn purge(&self, title: &Title, locale: &str, marker: Option<&FreshnessMarker>) {
        let key = CacheKey::render(title, locale, marker).encode();
        if let Err(e) = self.store.delete(&key).await {
            tracing::warn!(page = %title, locale, error = %e, "Failed to delete render entry");
        }
    }

    async fn lookup(&self, key: &str, title: &Title, marker: Option<&FreshnessMarker>) -> Lookup {
        match get_json::<Stamped<CachedRender>>(self.store.as_ref(), key).await {
            Ok(Some(Stamped {
                stored_at,
                value: CachedRender::Rendered { result },
            })) if result.is_usable() => Lookup::Hit(CacheRead::from_stamped(
                Stamped::new(result, stored_at),
                marker.cloned(),
            )),
            // A blank positive entry is treated like a failure.
            Ok(Some(_)) => Lookup::Negative,
            Ok(None) => Lookup::Miss,
            Err(e) => {
                tracing::warn!(page = %title, error = %e, "Render cache read failed, refetching");
                Lookup::Miss
            }
        }
    }

    async fn store_negative(&self, key: &str, title: &Title, now: Timestamp) {
        let entry = Stamped::new(CachedRender::Failed, now);
        self.store_entry(key, title, &entry, self.negative_ttl).await;
    }

    async fn store_entry(
        &self,
        key: &str,
        title: &Title,
        entry: &Stamped<CachedRender>,
        ttl: Duration,
    ) {
        if let Err(e) = set_json(self.store.as_ref(), key, entry, Some(ttl)).await {
            tracing::warn!(page = %title, error = %e, "Failed to store render entry");
        }
    }
}
