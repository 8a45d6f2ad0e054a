//! Per-site job queues.

use async_trait::async_trait;
use sharedhelp_core::{Job, QueueError, SiteId};
use std::collections::{BTreeMap, HashSet, VecDeque};

/// Hands a job to a site's execution runtime.
///
/// Returning `Ok` means the runtime accepted the job; delivery from then on
/// is the runtime's business (at least once, possibly out of order).
#[async_trait]
pub trait JobQueue: Send + Sync {
    async fn enqueue(&self, site: &SiteId, job: Job) -> Result<(), QueueError>;
}

/// In-process queues, one FIFO per site.
///
/// When built with [`InMemoryJobQueue::for_sites`], enqueueing to a site
/// outside the list fails with [`QueueError::UnknownSite`].
#[derive(Debug, Default)]
pub struct InMemoryJobQueue {
    queues: tokio::sync::Mutex<BTreeMap<SiteId, VecDeque<Job>>>,
    known: Option<HashSet<SiteId>>,
}

impl InMemoryJobQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn for_sites(sites: impl IntoIterator<Item = SiteId>) -> Self {
        Self {
            queues: tokio::sync::Mutex::new(BTreeMap::new()),
            known: Some(sites.into_iter().collect()),
        }
    }

    /// Take the oldest job queued for `site`.
    pub async fn dequeue(&self, site: &SiteId) -> Option<Job> {
        self.queues.lock().await.get_mut(site)?.pop_front()
    }

    pub async fn pending(&self, site: &SiteId) -> usize {
        self.queues.lock().await.get(site).map_or(0, VecDeque::len)
    }

    /// Sites with at least one queued job.
    pub async fn busy_sites(&self) -> Vec<SiteId> {
        self.queues
            .lock()
            .await
            .iter()
            .filter(|(_, jobs)| !jobs.is_empty())
            .map(|(site, _)| site.clone())
            .collect()
    }

    pub async fn total_pending(&self) -> usize {
        self.queues.lock().await.values().map(VecDeque::len).sum()
    }
}

#[async_trait]
impl JobQueue for InMemoryJobQueue {
    async fn enqueue(&self, site: &SiteId, job: Job) -> Result<(), QueueError> {
        if let Some(known) = &self.known {
            if !known.contains(site) {
                return Err(QueueError::UnknownSite {
                    site: site.to_string(),
                });
            }
        }
        self.queues
            .lock()
            .await
            .entry(site.clone())
            .or_default()
            .push_back(job);
        Ok(())
    }
}
