//! Cache key construction.
//!
//! A render key has five axes: namespace tag, schema version, freshness
//! marker, locale and page fingerprint. Two keys are equal only when every
//! axis is equal, and the string encoding is injective, so a new marker or a
//! different locale always lands on a different store entry.

use sha2::{Digest, Sha256};

use crate::{FreshnessMarker, Title};

/// Version of the serialized [`crate::CachedRender`] schema.
///
/// Bumping it orphans every previously stored render entry.
pub const RENDER_CACHE_VERSION: u32 = 2;

/// Prefix shared by every key this workspace writes.
const KEY_PREFIX: &str = "sharedhelppages";

/// Tag for rendered page entries.
const RENDER_TAG: &str = "parsed";

/// Hex SHA-256 of `text`. Used to keep arbitrary page names out of keys.
pub fn fingerprint(text: &str) -> String {
    hex::encode(Sha256::digest(text.as_bytes()))
}

/// Key of a cached render result.
///
/// The private inner struct means a key can only be built through
/// [`CacheKey::render`], which always hashes the page's prefixed title.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    inner: RenderKeyInner,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct RenderKeyInner {
    namespace_tag: &'static str,
    content_version: u32,
    freshness_marker: Option<FreshnessMarker>,
    locale: String,
    page_fingerprint: String,
}

impl CacheKey {
    /// Key for `title` rendered in `locale` at authority revision `marker`.
    pub fn render(title: &Title, locale: &str, marker: Option<&FreshnessMarker>) -> Self {
        Self::with_version(RENDER_CACHE_VERSION, title, locale, marker)
    }

    /// Same as [`CacheKey::render`] with an explicit schema version.
    pub fn with_version(
        content_version: u32,
        title: &Title,
        locale: &str,
        marker: Option<&FreshnessMarker>,
    ) -> Self {
        Self {
            inner: RenderKeyInner {
                namespace_tag: RENDER_TAG,
                content_version,
                freshness_marker: marker.cloned(),
                locale: locale.to_string(),
                page_fingerprint: fingerprint(&title.prefixed_text()),
            },
        }
    }

    pub fn content_version(&self) -> u32 {
        self.inner.content_version
    }

    pub fn freshness_marker(&self) -> Option<&FreshnessMarker> {
        self.inner.freshness_marker.as_ref()
    }

    pub fn locale(&self) -> &str {
        &self.inner.locale
    }

    pub fn page_fingerprint(&self) -> &str {
        &self.inner.page_fingerprint
    }

    /// Encode to the string used by the cache store.
    ///
    /// Format: `sharedhelppages:parsed:<version>:<marker>:<locale>:<fingerprint>`
    /// where an absent marker is empty and a present one is `=`-prefixed, and
    /// `%`/`:` inside components are percent-escaped.
    pub fn encode(&self) -> String {
        let marker = match &self.inner.freshness_marker {
            Some(marker) => format!("={}", escape_component(marker.as_str())),
            None => String::new(),
        };
        format!(
            "{}:{}:{}:{}:{}:{}",
            KEY_PREFIX,
            self.inner.namespace_tag,
            self.inner.content_version,
            marker,
            escape_component(&self.inner.locale),
            self.inner.page_fingerprint,
        )
    }

    /// Key of the namespace-name pair for `locale`.
    pub fn namespace_pair(locale: &str) -> String {
        format!("{}:projectns:{}", KEY_PREFIX, escape_component(locale))
    }

    /// Key of the freshness marker for `title`.
    pub fn touched(title: &Title) -> String {
        format!("{}:touched:{}", KEY_PREFIX, fingerprint(&title.db_key()))
    }

    /// Key of the canonical authority URL for `title`.
    pub fn source_url(title: &Title) -> String {
        format!("{}:url:{}", KEY_PREFIX, fingerprint(title.text()))
    }
}

fn escape_component(value: &str) -> String {
    value.replace('%', "%25").replace(':', "%3A")
}
