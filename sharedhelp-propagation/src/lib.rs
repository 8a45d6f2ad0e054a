//! SharedHelp Propagation - Invalidation Fan-out
//!
//! The write side of mirroring. When a help page changes on the authority,
//! [`InvalidationDispatcher`] queues one propagation task; running it enqueues
//! a [`SitePurgeTask`](sharedhelp_core::SitePurgeTask) on every dependent
//! site, where [`SitePurgeExecutor`] clears the edge cache, the file cache
//! and, when asked, the link table.

pub mod backends;
pub mod dispatcher;
pub mod executor;
pub mod queue;
pub mod registry;
pub mod runner;

pub use backends::{ApiLinkTable, DirectoryFileCache, HttpEdgeCache};
pub use dispatcher::{
    DispatchOutcome, DispatchState, DownstreamCaches, FanOutReport, InvalidationDispatcher,
    PageChangeObserver,
};
pub use executor::{
    encode_title, step_failure, EdgeCache, FileCache, LinkTable, PurgeReport, SitePurgeExecutor,
    SiteUrls,
};
pub use queue::{InMemoryJobQueue, JobQueue};
pub use registry::{SiteRegistry, StaticSiteRegistry};
pub use runner::{DrainReport, JobHandler, JobRouter, JobRunner};
