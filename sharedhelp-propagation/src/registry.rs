//! Which sites depend on the authority.

use async_trait::async_trait;
use sharedhelp_core::{MirrorConfig, SiteId};

/// Source of the current list of dependent sites.
///
/// Read fresh on every fan-out, so sites added or removed between two edits
/// are picked up without a restart. An empty list is valid.
#[async_trait]
pub trait SiteRegistry: Send + Sync {
    async fn sites(&self) -> Vec<SiteId>;
}

/// Registry over a fixed list, normally from configuration.
#[derive(Debug, Clone, Default)]
pub struct StaticSiteRegistry {
    sites: Vec<SiteId>,
}

impl StaticSiteRegistry {
    pub fn new(sites: Vec<SiteId>) -> Self {
        Self { sites }
    }

    pub fn from_config(config: &MirrorConfig) -> Self {
        Self::new(config.site_ids())
    }
}

#[async_trait]
impl SiteRegistry for StaticSiteRegistry {
    async fn sites(&self) -> Vec<SiteId> {
        self.sites.clone()
    }
}
