//! Clearing a dependent site's caches for one help page.

use async_trait::async_trait;
use serde::Serialize;
use sharedhelp_core::{
    MirrorConfig, Namespace, PurgeError, PurgeLayer, SiteId, SitePurgeTask, Title,
};
use std::sync::Arc;

/// Edge (HTTP accelerator) cache.
#[async_trait]
pub trait EdgeCache: Send + Sync {
    /// Evict every URL in `urls`.
    async fn purge(&self, title: &Title, urls: &[String]) -> Result<(), PurgeError>;
}

/// Static HTML snapshot cache.
#[async_trait]
pub trait FileCache: Send + Sync {
    /// Remove the snapshot of `title`; a missing snapshot is not an error.
    async fn clear(&self, title: &Title) -> Result<(), PurgeError>;
}

/// The site's link graph.
#[async_trait]
pub trait LinkTable: Send + Sync {
    /// Invalidate pages that link to `title` so their link colours update.
    async fn touch_links_to(&self, title: &Title) -> Result<(), PurgeError>;
}

/// URL layout of a site, for building the edge-cache URLs of a page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiteUrls {
    server: String,
    article_path: String,
    script_path: String,
}

impl SiteUrls {
    pub fn new(
        server: impl Into<String>,
        article_path: impl Into<String>,
        script_path: impl Into<String>,
    ) -> Self {
        Self {
            server: server.into().trim_end_matches('/').to_string(),
            article_path: article_path.into(),
            script_path: script_path.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn from_config(config: &MirrorConfig) -> Self {
        Self::new(&config.server, &config.article_path, &config.script_path)
    }

    /// Every URL under which `title` may be cached: the article view, the
    /// history view and the raw `index.php` form.
    pub fn variants(&self, title: &Title) -> Vec<String> {
        let encoded = encode_title(&title.prefixed_db_key());
        let index = format!("{}{}/index.php?title={}", self.server, self.script_path, encoded);
        vec![
            format!("{}{}", self.server, self.article_path.replace("$1", &encoded)),
            format!("{}&action=history", index),
            index,
        ]
    }

    /// The site's API endpoint.
    pub fn api_url(&self) -> String {
        format!("{}{}/api.php", self.server, self.script_path)
    }
}

/// Percent-encode a title for a URL path, keeping `:` and `/` readable.
pub fn encode_title(db_key: &str) -> String {
    urlencoding::encode(db_key)
        .replace("%3A", ":")
        .replace("%2F", "/")
}

/// Outcome of one purge run.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PurgeReport {
    /// Titles whose caches were targeted.
    pub titles: Vec<String>,
    pub steps_succeeded: usize,
    /// Failed steps, as messages. Failures never stop the other steps.
    pub failures: Vec<String>,
}

impl PurgeReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    fn record(&mut self, result: Result<(), PurgeError>, site: &SiteId) {
        match result {
            Ok(()) => self.steps_succeeded += 1,
            Err(e) => {
                tracing::warn!(site = %site, error = %e, "Purge step failed");
                self.failures.push(e.to_string());
            }
        }
    }
}

/// Runs [`SitePurgeTask`]s on one dependent site.
///
/// Purges the help page and its talk page so both tabs recolour. Each step
/// is independent: an edge-cache failure still lets the file cache and link
/// refresh run. Re-running a task only repeats idempotent evictions.
pub struct SitePurgeExecutor {
    site: SiteId,
    urls: SiteUrls,
    edge: Option<Arc<dyn EdgeCache>>,
    file: Option<Arc<dyn FileCache>>,
    links: Arc<dyn LinkTable>,
}

impl SitePurgeExecutor {
    pub fn new(site: SiteId, urls: SiteUrls, links: Arc<dyn LinkTable>) -> Self {
        Self {
            site,
            urls,
            edge: None,
            file: None,
            links,
        }
    }

    pub fn with_edge_cache(mut self, edge: Arc<dyn EdgeCache>) -> Self {
        self.edge = Some(edge);
        self
    }

    pub fn with_file_cache(mut self, file: Arc<dyn FileCache>) -> Self {
        self.file = Some(file);
        self
    }

    pub fn site(&self) -> &SiteId {
        &self.site
    }

    pub async fn run(&self, task: &SitePurgeTask) -> PurgeReport {
        let mut report = PurgeReport::default();
        let Some(title) = Title::new(Namespace::Help, &task.page_name) else {
            tracing::error!(site = %self.site, page = %task.page_name, "Invalid help page name, nothing to purge");
            return report;
        };
        let other = title.other_page();

        for target in [&title, &other] {
            report.titles.push(target.prefixed_text());
            if let Some(edge) = &self.edge {
                let urls = self.urls.variants(target);
                report.record(edge.purge(target, &urls).await, &self.site);
            }
            if let Some(file) = &self.file {
                report.record(file.clear(target).await, &self.site);
            }
        }

        if task.touch_links {
            report.record(self.links.touch_links_to(&title).await, &self.site);
        }

        tracing::info!(
            site = %self.site,
            page = %title,
            touch_links = task.touch_links,
            steps = report.steps_succeeded,
            failures = report.failures.len(),
            "Purged mirrored help page"
        );
        report
    }
}

/// Wrap a backend error message as a step failure.
pub fn step_failure(layer: PurgeLayer, title: &Title, reason: impl Into<String>) -> PurgeError {
    PurgeError::PurgeStepFailure {
        layer,
        title: title.prefixed_text(),
        reason: reason.into(),
    }
}
