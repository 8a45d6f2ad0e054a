//! The read-side facade: what a mirror shows for a missing help page.

use serde::Serialize;
use sharedhelp_core::{Clock, MirrorConfig, RenderResult, Title};
use sharedhelp_remote::{
    ApiTouchedStore, AuthorityClient, NamespaceTranslationCache, RemoteContentFetcher,
    SourceUrlResolver,
};
use sharedhelp_storage::CacheStore;
use std::sync::Arc;

use crate::{
    ContentCache, DisplayPolicy, FreshnessOracle, ModuleRegistry, PurgeAction,
    MIRROR_STYLE_MODULE,
};

/// A help page as shown on a mirror.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MirroredPage {
    pub title: Title,
    /// Render with modules filtered to the ones this site has.
    pub render: RenderResult,
    /// Canonical URL of the authority copy, empty if unknown.
    pub source_url: String,
    pub from_cache: bool,
}

/// Wires the read-side components for one site.
///
/// The reader's language is passed per call: renders are fetched with
/// `uselang` and cached per locale.
pub struct MirrorService {
    policy: Arc<DisplayPolicy>,
    oracle: Arc<FreshnessOracle>,
    content: Arc<ContentCache>,
    source_urls: Arc<SourceUrlResolver>,
    modules: Arc<dyn ModuleRegistry>,
}

impl MirrorService {
    pub fn new(
        policy: Arc<DisplayPolicy>,
        oracle: Arc<FreshnessOracle>,
        content: Arc<ContentCache>,
        source_urls: Arc<SourceUrlResolver>,
        modules: Arc<dyn ModuleRegistry>,
    ) -> Self {
        Self {
            policy,
            oracle,
            content,
            source_urls,
            modules,
        }
    }

    /// Build every component from configuration over one authority client
    /// and one cache store.
    pub fn from_config(
        config: &MirrorConfig,
        client: Arc<dyn AuthorityClient>,
        store: Arc<dyn CacheStore>,
        clock: Arc<dyn Clock>,
        modules: Arc<dyn ModuleRegistry>,
    ) -> Self {
        let namespaces = Arc::new(NamespaceTranslationCache::new(
            client.clone(),
            store.clone(),
            config.namespace_ttl(),
        ));
        let fetcher = Arc::new(RemoteContentFetcher::from_config(
            client.clone(),
            namespaces,
            config,
        ));
        let touched = Arc::new(ApiTouchedStore::new(
            client.clone(),
            config.content_language.clone(),
        ));
        let oracle = Arc::new(FreshnessOracle::new(
            touched,
            store.clone(),
            clock.clone(),
            config.memo_capacity,
            config.freshness_ttl(),
            config.negative_ttl(),
        ));
        let content = Arc::new(ContentCache::new(
            fetcher,
            store.clone(),
            clock.clone(),
            config.content_ttl(),
            config.negative_ttl(),
        ));
        let policy = Arc::new(DisplayPolicy::new(config, oracle.clone(), clock));
        let source_urls = Arc::new(SourceUrlResolver::new(client, store));

        Self::new(
            policy,
            oracle,
            content,
            source_urls,
            modules,
        )
    }

    pub fn policy(&self) -> &DisplayPolicy {
        &self.policy
    }

    /// Mirrored content for `title` in the reader's `locale`, or `None` when
    /// the site should fall back to its normal missing-page view.
    pub async fn render_missing_page(&self, title: &Title, locale: &str) -> Option<MirroredPage> {
        if !self.policy.should_display(title).await {
            return None;
        }

        // In development mode the page may not exist on the authority; the
        // render is then keyed without a marker.
        let marker = self.oracle.resolve(title).await;
        if marker.is_none() && !self.policy.development_mode() {
            return None;
        }
        let read = self
            .content
            .get_or_fetch(title, locale, marker.as_ref())
            .await?;
        let from_cache = read.was_cache_hit();

        let mut render = read
            .into_value()
            .retain_modules(|module| self.modules.is_registered(module));
        render.add_module_style(MIRROR_STYLE_MODULE);

        let source_url = self.source_urls.resolve(title, locale).await;
        tracing::info!(page = %title, locale, from_cache, "Serving mirrored help page");

        Some(MirroredPage {
            title: title.clone(),
            render,
            source_url,
            from_cache,
        })
    }

    /// Manual purge of `title` on this site.
    pub fn purge_action(&self) -> PurgeAction {
        PurgeAction::new(
            self.content.clone(),
            self.oracle.clone(),
            self.policy.clone(),
        )
    }
}
