//! Change events and the units of invalidation work they produce.

use serde::{Deserialize, Serialize};

use crate::Title;

/// What happened to an authority page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChangeKind {
    Created,
    /// `affects_links` is set by the write path when the edit can change how
    /// links to the page render (red/blue).
    Edited { affects_links: bool },
    Deleted,
    /// Rendered output changed without a content change.
    Purged,
}

impl ChangeKind {
    /// Whether dependent sites must refresh link tables for this change.
    pub fn touches_links(self) -> bool {
        match self {
            Self::Created | Self::Deleted => true,
            Self::Edited { affects_links } => affects_links,
            Self::Purged => false,
        }
    }
}

/// Emitted by the authority's write path once a mutation completes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageChanged {
    pub title: Title,
    pub kind: ChangeKind,
}

impl PageChanged {
    pub fn new(title: Title, kind: ChangeKind) -> Self {
        Self { title, kind }
    }
}

/// One per detected change; fanned out to every dependent site when run.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PropagationTask {
    /// Page text without the Help namespace prefix.
    pub page_name: String,
    pub touch_links: bool,
}

/// One per dependent site. Running it twice has the same effect as once.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SitePurgeTask {
    pub page_name: String,
    pub touch_links: bool,
}

impl From<&PropagationTask> for SitePurgeTask {
    fn from(task: &PropagationTask) -> Self {
        Self {
            page_name: task.page_name.clone(),
            touch_links: task.touch_links,
        }
    }
}

/// Payload carried by the execution runtime's queues.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Job {
    Propagate(PropagationTask),
    SitePurge(SitePurgeTask),
}

impl Job {
    pub fn page_name(&self) -> &str {
        match self {
            Self::Propagate(task) => &task.page_name,
            Self::SitePurge(task) => &task.page_name,
        }
    }
}
