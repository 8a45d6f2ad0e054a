//! Manual purge of a mirrored page.

use sharedhelp_core::Title;
use std::sync::Arc;

use crate::{ContentCache, DisplayPolicy, FreshnessOracle};

/// Clears what this site cached for a mirrored page.
///
/// Render entries are keyed by marker and cannot be enumerated, so only the
/// entry for the currently known marker is deleted. Older entries are
/// unreachable anyway and age out on their own TTL. Renders are per locale,
/// so the purge clears the copy in the purging reader's language.
pub struct PurgeAction {
    content: Arc<ContentCache>,
    oracle: Arc<FreshnessOracle>,
    policy: Arc<DisplayPolicy>,
}

impl PurgeAction {
    pub fn new(
        content: Arc<ContentCache>,
        oracle: Arc<FreshnessOracle>,
        policy: Arc<DisplayPolicy>,
    ) -> Self {
        Self {
            content,
            oracle,
            policy,
        }
    }

    pub async fn run(&self, title: &Title, locale: &str) {
        let marker = self.oracle.resolve(title).await;
        self.content.purge(title, locale, marker.as_ref()).await;
        self.oracle.invalidate(title).await;
        self.policy.invalidate(title);
        tracing::info!(page = %title, locale, "Purged mirrored page");
    }
}
