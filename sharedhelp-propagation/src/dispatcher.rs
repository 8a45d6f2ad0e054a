//! Turning an authority edit into purge work on every dependent site.
//!
//! Two stages. The write path hands a [`PageChanged`] event to
//! [`InvalidationDispatcher::dispatch`], which only enqueues one
//! [`PropagationTask`] on the authority's own queue and returns. When the
//! runtime later runs that task, [`InvalidationDispatcher::fan_out`] reads the
//! registry and enqueues one [`SitePurgeTask`] per site. The edit never waits
//! on the fleet.

use async_trait::async_trait;
use serde::Serialize;
use sharedhelp_core::{
    HubResolver, Job, MirrorConfig, Namespace, PageChanged, PropagationTask, QueueError, SiteId,
    SitePurgeTask,
};
use std::sync::Arc;

use crate::{JobQueue, SiteRegistry};

/// Consumer of page change events from the write path.
#[async_trait]
pub trait PageChangeObserver: Send + Sync {
    async fn on_page_changed(&self, event: &PageChanged);
}

/// Which cache layers exist downstream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DownstreamCaches {
    pub edge_cache: bool,
    pub file_cache: bool,
}

impl DownstreamCaches {
    pub fn from_config(config: &MirrorConfig) -> Self {
        Self {
            edge_cache: config.use_edge_cache,
            file_cache: config.use_file_cache,
        }
    }
}

/// What `dispatch` did with an event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// Not a page other sites mirror.
    Ineligible,
    /// No downstream cache and no link refresh: nothing would consume it.
    Skipped,
    Queued(PropagationTask),
}

/// Fan-out progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DispatchState {
    Idle,
    Dispatched,
    Terminal,
}

/// Result of fanning one task out to the fleet.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FanOutReport {
    pub state: DispatchState,
    pub task: PropagationTask,
    pub enqueued: Vec<SiteId>,
    /// Sites whose enqueue failed, with the reason.
    pub failed: Vec<(SiteId, String)>,
}

impl FanOutReport {
    fn new(task: PropagationTask) -> Self {
        Self {
            state: DispatchState::Idle,
            task,
            enqueued: Vec::new(),
            failed: Vec::new(),
        }
    }

    pub fn attempted(&self) -> usize {
        self.enqueued.len() + self.failed.len()
    }
}

pub struct InvalidationDispatcher {
    hubs: HubResolver,
    caches: DownstreamCaches,
    registry: Arc<dyn SiteRegistry>,
    queue: Arc<dyn JobQueue>,
}

impl InvalidationDispatcher {
    pub fn new(
        config: &MirrorConfig,
        registry: Arc<dyn SiteRegistry>,
        queue: Arc<dyn JobQueue>,
    ) -> Self {
        Self {
            hubs: HubResolver::new(config),
            caches: DownstreamCaches::from_config(config),
            registry,
            queue,
        }
    }

    /// Site whose queue receives propagation tasks.
    pub fn authority(&self) -> SiteId {
        self.hubs.authority()
    }

    /// Queue a propagation task for `event` if anything downstream needs it.
    pub async fn dispatch(&self, event: &PageChanged) -> Result<DispatchOutcome, QueueError> {
        let title = &event.title;
        if !self.hubs.is_authority() || !title.in_namespace(Namespace::Help) || !title.is_root() {
            return Ok(DispatchOutcome::Ineligible);
        }

        let task = PropagationTask {
            page_name: title.text().to_string(),
            touch_links: event.kind.touches_links(),
        };
        if !self.caches.edge_cache && !self.caches.file_cache && !task.touch_links {
            tracing::debug!(page = %title, "No downstream caches, skipping propagation");
            return Ok(DispatchOutcome::Skipped);
        }

        let hub = self.authority();
        self.queue
            .enqueue(&hub, Job::Propagate(task.clone()))
            .await?;
        tracing::info!(
            page = %title,
            touch_links = task.touch_links,
            hub = %hub,
            "Queued help page propagation"
        );
        Ok(DispatchOutcome::Queued(task))
    }

    /// Enqueue one site purge per registered site.
    ///
    /// Every site is attempted; a failed enqueue is logged and recorded but
    /// does not stop the loop. Nothing is retried here.
    pub async fn fan_out(&self, task: &PropagationTask) -> FanOutReport {
        let mut report = FanOutReport::new(task.clone());
        let sites = self.registry.sites().await;
        report.state = DispatchState::Dispatched;

        let site_task = SitePurgeTask::from(task);
        for site in sites {
            match self
                .queue
                .enqueue(&site, Job::SitePurge(site_task.clone()))
                .await
            {
                Ok(()) => report.enqueued.push(site),
                Err(e) => {
                    tracing::error!(
                        site = %site,
                        page = %task.page_name,
                        error = %e,
                        "Failed to enqueue site purge"
                    );
                    report.failed.push((site, e.to_string()));
                }
            }
        }

        report.state = DispatchState::Terminal;
        tracing::info!(
            page = %task.page_name,
            enqueued = report.enqueued.len(),
            failed = report.failed.len(),
            "Fanned out help page purge"
        );
        report
    }
}

#[async_trait]
impl PageChangeObserver for InvalidationDispatcher {
    async fn on_page_changed(&self, event: &PageChanged) {
        if let Err(e) = self.dispatch(event).await {
            tracing::error!(page = %event.title, error = %e, "Failed to queue propagation");
        }
    }
}
