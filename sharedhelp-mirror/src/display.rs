//! Whether a site shows mirrored help for a page.

use sharedhelp_core::{Clock, HubResolver, MirrorConfig, Namespace, Title};
use sharedhelp_storage::BoundedMemo;
use std::sync::Arc;

use crate::FreshnessOracle;

/// Decides which pages get mirrored content and which are sources.
///
/// Positive and negative existence answers are memoized per process in a
/// bounded LRU that expires with the freshness TTL.
pub struct DisplayPolicy {
    hubs: HubResolver,
    development_mode: bool,
    oracle: Arc<FreshnessOracle>,
    memo: BoundedMemo<String, bool>,
}

impl DisplayPolicy {
    pub fn new(config: &MirrorConfig, oracle: Arc<FreshnessOracle>, clock: Arc<dyn Clock>) -> Self {
        Self {
            hubs: HubResolver::new(config),
            development_mode: config.development_mode,
            oracle,
            memo: BoundedMemo::new(config.memo_capacity, clock)
                .with_max_age(config.freshness_ttl()),
        }
    }

    /// True when `title` should show the authority's copy here.
    ///
    /// Never on the authority itself, never on a site whose content
    /// language has no shared help, and never outside the Help namespace.
    /// Development mode skips the existence check.
    pub async fn should_display(&self, title: &Title) -> bool {
        if self.hubs.is_authority()
            || !self.hubs.is_supported_language()
            || !title.in_namespace(Namespace::Help)
        {
            return false;
        }
        if self.development_mode {
            return true;
        }

        let key = title.prefixed_db_key();
        if let Some(display) = self.memo.get(&key) {
            return display;
        }
        let display = self.oracle.resolve(title).await.is_some();
        self.memo.insert(key, display);
        display
    }

    /// True when `title` is a page other sites mirror: a root Help page on
    /// the authority.
    pub fn is_source_page(&self, title: &Title) -> bool {
        self.hubs.is_authority() && title.in_namespace(Namespace::Help) && title.is_root()
    }

    pub fn development_mode(&self) -> bool {
        self.development_mode
    }

    /// Forget the memoized decision for `title`.
    pub fn invalidate(&self, title: &Title) {
        self.memo.remove(&title.prefixed_db_key());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MapTouched;
    use sharedhelp_test_utils::ManualClock;
    use sharedhelp_storage::InMemoryCacheStore;
    use std::time::Duration;

    fn policy(config: MirrorConfig, touched: Arc<MapTouched>) -> DisplayPolicy {
        let clock = ManualClock::new();
        let store = Arc::new(InMemoryCacheStore::new(clock.clone()));
        let oracle = Arc::new(FreshnessOracle::new(
            touched,
            store,
            clock.clone(),
            100,
            Duration::from_secs(30),
            Duration::from_secs(10),
        ));
        DisplayPolicy::new(&config, oracle, clock)
    }

    fn mirror_config() -> MirrorConfig {
        MirrorConfig {
            current_site: "dnd_wiki".to_string(),
            ..MirrorConfig::default()
        }
    }

    #[tokio::test]
    async fn test_existing_help_page_is_displayed_and_memoized() {
        let touched = MapTouched::with("Help:Editing", "v1");
        let policy = policy(mirror_config(), touched.clone());
        let title = Title::help("Editing").unwrap();

        assert!(policy.should_display(&title).await);
        assert!(policy.should_display(&title).await);
        assert_eq!(touched.calls(), 1);
    }

    #[tokio::test]
    async fn test_missing_page_not_displayed() {
        let policy = policy(mirror_config(), Arc::new(MapTouched::default()));
        assert!(!policy.should_display(&Title::help("Nope").unwrap()).await);
    }

    #[tokio::test]
    async fn test_never_on_hub_or_outside_help() {
        let touched = MapTouched::with("Help:Editing", "v1");
        let on_hub = policy(MirrorConfig::default(), touched.clone());
        assert!(!on_hub.should_display(&Title::help("Editing").unwrap()).await);

        let mirror = policy(mirror_config(), touched.clone());
        assert!(!mirror.should_display(&Title::parse("Main Page").unwrap()).await);
        assert!(
            !mirror
                .should_display(&Title::parse("Help talk:Editing").unwrap())
                .await
        );
        assert_eq!(touched.calls(), 0);
    }

    #[tokio::test]
    async fn test_unsupported_content_language_is_never_displayed() {
        let touched = MapTouched::with("Help:Editing", "v1");
        let config = MirrorConfig {
            content_language: "ja".to_string(),
            supported_languages: vec!["fr".to_string()],
            ..mirror_config()
        };
        let unsupported = policy(config, touched.clone());
        assert!(!unsupported.should_display(&Title::help("Editing").unwrap()).await);

        let dev = policy_with_dev_mode(MirrorConfig {
            content_language: "ja".to_string(),
            ..mirror_config()
        });
        assert!(!dev.should_display(&Title::help("Editing").unwrap()).await);
        assert_eq!(touched.calls(), 0);

        let french = policy(
            MirrorConfig {
                content_language: "fr".to_string(),
                supported_languages: vec!["fr".to_string()],
                current_site: "dnd_wiki".to_string(),
                ..MirrorConfig::default()
            },
            MapTouched::with("Help:Editing", "v1"),
        );
        assert!(french.should_display(&Title::help("Editing").unwrap()).await);
    }

    fn policy_with_dev_mode(config: MirrorConfig) -> DisplayPolicy {
        policy(
            MirrorConfig {
                development_mode: true,
                ..config
            },
            Arc::new(MapTouched::default()),
        )
    }

    #[tokio::test]
    async fn test_development_mode_skips_lookup() {
        let touched = Arc::new(MapTouched::default());
        let config = MirrorConfig {
            development_mode: true,
            ..mirror_config()
        };
        let policy = policy(config, touched.clone());
        assert!(policy.should_display(&Title::help("Anything").unwrap()).await);
        assert_eq!(touched.calls(), 0);
    }

    #[tokio::test]
    async fn test_invalidate_rechecks() {
        let touched = Arc::new(MapTouched::default());
        let policy = policy(mirror_config(), touched.clone());
        let title = Title::help("New page").unwrap();

        assert!(!policy.should_display(&title).await);
        touched.set("Help:New page", "v1");
        policy.invalidate(&title);
        // The oracle still remembers the page as missing until its own TTL
        // runs out, so only the memo layer is re-asked here.
        assert!(!policy.should_display(&title).await);
        assert_eq!(touched.calls(), 1);
    }

    #[test]
    fn test_source_pages() {
        let on_hub = policy(MirrorConfig::default(), Arc::new(MapTouched::default()));
        assert!(on_hub.is_source_page(&Title::help("Editing").unwrap()));
        assert!(!on_hub.is_source_page(&Title::help("Editing/Tables").unwrap()));
        assert!(!on_hub.is_source_page(&Title::parse("Main Page").unwrap()));

        let mirror = policy(mirror_config(), Arc::new(MapTouched::default()));
        assert!(!mirror.is_source_page(&Title::help("Editing").unwrap()));
    }
}
