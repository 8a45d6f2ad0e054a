//! Local execution of queued jobs.
//!
//! Stands in for the job runtime in single-process deployments and tests.
//! Each site's queue is drained by its own tokio task, so a slow site never
//! holds up another.

use async_trait::async_trait;
use serde::Serialize;
use sharedhelp_core::{Job, SiteId};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::task::JoinSet;

use crate::{InMemoryJobQueue, InvalidationDispatcher, SitePurgeExecutor};

/// Runs one job on behalf of `site`.
#[async_trait]
pub trait JobHandler: Send + Sync {
    async fn handle(&self, site: &SiteId, job: Job);
}

/// Routes propagation jobs to the dispatcher and site purges to the
/// executor registered for the site.
pub struct JobRouter {
    dispatcher: Arc<InvalidationDispatcher>,
    executors: HashMap<SiteId, Arc<SitePurgeExecutor>>,
}

impl JobRouter {
    pub fn new(dispatcher: Arc<InvalidationDispatcher>) -> Self {
        Self {
            dispatcher,
            executors: HashMap::new(),
        }
    }

    pub fn with_executor(mut self, executor: Arc<SitePurgeExecutor>) -> Self {
        self.executors.insert(executor.site().clone(), executor);
        self
    }
}

#[async_trait]
impl JobHandler for JobRouter {
    async fn handle(&self, site: &SiteId, job: Job) {
        match job {
            Job::Propagate(task) => {
                self.dispatcher.fan_out(&task).await;
            }
            Job::SitePurge(task) => match self.executors.get(site) {
                Some(executor) => {
                    executor.run(&task).await;
                }
                None => {
                    tracing::error!(site = %site, page = %task.page_name, "No purge executor for site, dropping job");
                }
            },
        }
    }
}

/// Totals from one [`JobRunner::run_until_idle`] call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DrainReport {
    pub rounds: usize,
    pub jobs_run: usize,
    /// Site workers that panicked.
    pub crashed_workers: usize,
}

pub struct JobRunner {
    queue: Arc<InMemoryJobQueue>,
    handler: Arc<dyn JobHandler>,
}

impl JobRunner {
    pub fn new(queue: Arc<InMemoryJobQueue>, handler: Arc<dyn JobHandler>) -> Self {
        Self { queue, handler }
    }

    /// Drain every queue, including jobs enqueued while draining.
    ///
    /// Each round spawns one worker per busy site and waits for all of them.
    /// A worker that panics loses only the job it was running.
    pub async fn run_until_idle(&self) -> DrainReport {
        let mut report = DrainReport::default();

        loop {
            let sites = self.queue.busy_sites().await;
            if sites.is_empty() {
                break;
            }
            report.rounds += 1;

            let mut workers = JoinSet::new();
            for site in sites {
                let queue = self.queue.clone();
                let handler = self.handler.clone();
                workers.spawn(async move {
                    let mut ran = 0usize;
                    while let Some(job) = queue.dequeue(&site).await {
                        handler.handle(&site, job).await;
                        ran += 1;
                    }
                    ran
                });
            }

            while let Some(joined) = workers.join_next().await {
                match joined {
                    Ok(ran) => report.jobs_run += ran,
                    Err(e) => {
                        tracing::error!(error = %e, "Site worker failed");
                        report.crashed_workers += 1;
                    }
                }
            }
        }

        tracing::debug!(rounds = report.rounds, jobs = report.jobs_run, "Job queues drained");
        report
    }
}
