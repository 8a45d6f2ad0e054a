//! SharedHelp Core - Types, Keys, Errors and Configuration
//!
//! Pure data structures shared by every other crate in the workspace.
//! Content fetching, caching and propagation live in their own crates;
//! this crate holds only the vocabulary they speak.

pub mod config;
pub mod error;
pub mod hub;
pub mod key;
pub mod render;
pub mod task;
pub mod title;

pub use config::{ConfigError, MirrorConfig};
pub use error::{
    FetchError, MetadataError, MirrorError, MirrorResult, PurgeError, PurgeLayer, QueueError,
    StoreError,
};
pub use hub::HubResolver;
pub use key::{fingerprint, CacheKey, RENDER_CACHE_VERSION};
pub use render::{CachedMarker, CachedRender, NamespaceTranslationPair, RenderResult};
pub use task::{ChangeKind, Job, PageChanged, PropagationTask, SitePurgeTask};
pub use title::{Namespace, Title};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// IDENTITY TYPES
// ============================================================================

/// Timestamp type using UTC timezone.
pub type Timestamp = DateTime<Utc>;

/// Opaque identifier of a site in the fleet (its database name).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SiteId(String);

impl SiteId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SiteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SiteId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// Last-modified marker of an authority page (its `page_touched` value).
///
/// Opaque: only equality matters. A different marker means different content.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FreshnessMarker(String);

impl FreshnessMarker {
    pub fn new(marker: impl Into<String>) -> Self {
        Self(marker.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FreshnessMarker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ============================================================================
// CLOCK
// ============================================================================

/// Source of the current time.
///
/// Every TTL decision goes through a clock so tests can move time explicitly.
pub trait Clock: Send + Sync {
    fn now(&self) -> Timestamp;
}

/// Wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        Utc::now()
    }
}
