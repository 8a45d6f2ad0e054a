//! SharedHelp command-line entry point.
//!
//! Loads configuration, sets up logging and runs one command against the
//! configured site.

mod command;
mod logging;

use std::sync::Arc;

use command::{Command, USAGE};
use sharedhelp_core::{
    ChangeKind, ConfigError, FetchError, MirrorConfig, PageChanged, SystemClock, Title,
};
use sharedhelp_mirror::{AllModules, MirrorService};
use sharedhelp_propagation::{
    ApiLinkTable, DirectoryFileCache, DispatchOutcome, HttpEdgeCache, InMemoryJobQueue,
    InvalidationDispatcher, SitePurgeExecutor, SiteUrls, StaticSiteRegistry,
};
use sharedhelp_remote::HttpAuthorityClient;
use sharedhelp_storage::{CacheStore, InMemoryCacheStore};

#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error("{0}")]
    Usage(String),
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("Authority client error: {0}")]
    Fetch(#[from] FetchError),
    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Queue error: {0}")]
    Queue(#[from] sharedhelp_core::QueueError),
    #[error("Output error: {0}")]
    Output(#[from] serde_json::Error),
    #[error("Failed to initialize logging: {0}")]
    Logging(String),
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("sharedhelp: {}", e);
        if matches!(e, CliError::Usage(_)) {
            eprintln!("{}", USAGE);
        }
        std::process::exit(1);
    }
}

async fn run() -> Result<(), CliError> {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let command = Command::parse(&args)?;
    if command == Command::Help {
        println!("{}", USAGE);
        return Ok(());
    }

    logging::init()?;
    let config = MirrorConfig::load()?;
    tracing::debug!(site = %config.current_site, language = %config.content_language, "Configuration loaded");

    match command {
        Command::Render { title, json, lang } => {
            let lang = lang.as_deref().unwrap_or(&config.content_language);
            render(&config, &title, lang, json).await
        }
        Command::Purge { title, lang } => {
            let lang = lang.as_deref().unwrap_or(&config.content_language);
            let (service, _) = mirror_service(&config)?;
            service.purge_action().run(&title, lang).await;
            Ok(())
        }
        Command::Dispatch { title, kind } => dispatch(&config, title, kind).await,
        Command::PurgeSite { title, touch_links } => {
            purge_site(&config, &title, touch_links).await
        }
        Command::Help => Ok(()),
    }
}

fn mirror_service(
    config: &MirrorConfig,
) -> Result<(MirrorService, Arc<InMemoryCacheStore>), CliError> {
    let client = Arc::new(HttpAuthorityClient::new(config)?);
    let clock = Arc::new(SystemClock);
    let store = Arc::new(InMemoryCacheStore::new(clock.clone()));
    let service = MirrorService::from_config(
        config,
        client,
        store.clone(),
        clock,
        Arc::new(AllModules),
    );
    Ok((service, store))
}

async fn render(
    config: &MirrorConfig,
    title: &Title,
    lang: &str,
    json: bool,
) -> Result<(), CliError> {
    let (service, store) = mirror_service(config)?;
    let page = service.render_missing_page(title, lang).await;
    match store.stats().await {
        Ok(stats) => tracing::debug!(
            hits = stats.hits,
            misses = stats.misses,
            hit_rate = stats.hit_rate(),
            "Cache statistics"
        ),
        Err(e) => tracing::warn!(error = %e, "Failed to read cache statistics"),
    }
    match page {
        Some(page) if json => println!("{}", serde_json::to_string_pretty(&page)?),
        Some(page) => println!("{}", page.render.html),
        None => {
            tracing::info!(page = %title, "Nothing to mirror");
            if json {
                println!("null");
            }
        }
    }
    Ok(())
}

/// Dispatch a change and run the resulting propagation task in-process,
/// printing which sites received a purge task.
async fn dispatch(config: &MirrorConfig, title: Title, kind: ChangeKind) -> Result<(), CliError> {
    let queue = Arc::new(InMemoryJobQueue::new());
    let dispatcher = InvalidationDispatcher::new(
        config,
        Arc::new(StaticSiteRegistry::from_config(config)),
        queue.clone(),
    );

    match dispatcher.dispatch(&PageChanged::new(title, kind)).await? {
        DispatchOutcome::Queued(task) => {
            let report = dispatcher.fan_out(&task).await;
            tracing::debug!(pending = queue.total_pending().await, "Site purge tasks queued");
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        DispatchOutcome::Ineligible => {
            tracing::warn!("Not a mirrored page on the authority, nothing dispatched")
        }
        DispatchOutcome::Skipped => {
            tracing::info!("No downstream caches configured, nothing dispatched")
        }
    }
    Ok(())
}

async fn purge_site(config: &MirrorConfig, title: &Title, touch_links: bool) -> Result<(), CliError> {
    let urls = SiteUrls::from_config(config);
    let links = Arc::new(ApiLinkTable::new(urls.api_url(), config.request_timeout())?);
    let mut executor = SitePurgeExecutor::new(config.current_site_id(), urls, links);
    if config.use_edge_cache {
        executor = executor.with_edge_cache(Arc::new(HttpEdgeCache::new(config.request_timeout())?));
    }
    // Validation guarantees a directory when the file cache is on.
    if let Some(dir) = config.file_cache_directory.as_ref().filter(|_| config.use_file_cache) {
        executor = executor.with_file_cache(Arc::new(DirectoryFileCache::new(dir.clone())));
    }

    let report = executor
        .run(&sharedhelp_core::SitePurgeTask {
            page_name: title.text().to_string(),
            touch_links,
        })
        .await;
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
