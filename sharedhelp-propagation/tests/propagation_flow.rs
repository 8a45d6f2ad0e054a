//! Write-side behaviour from a hub edit to purges on every dependent site.

use proptest::prelude::*;
use sharedhelp_core::{Job, PropagationTask, SiteId, SitePurgeTask};
use sharedhelp_propagation::{
    DispatchOutcome, DispatchState, InMemoryJobQueue, InvalidationDispatcher, JobRouter,
    JobRunner, SitePurgeExecutor, SiteUrls, StaticSiteRegistry,
};
use sharedhelp_test_utils::assertions::{assert_both_pages_cleared, assert_site_purge_queued};
use sharedhelp_test_utils::fixtures::{created, edited, hub_config, mirror_config};
use sharedhelp_test_utils::generators::arb_site_ids;
use sharedhelp_test_utils::{PurgeCall, RecordingJobQueue, RecordingPurgeBackend};
use std::sync::Arc;

fn executor(site: &str, backend: Arc<RecordingPurgeBackend>) -> Arc<SitePurgeExecutor> {
    let urls = SiteUrls::from_config(&mirror_config(site));
    Arc::new(
        SitePurgeExecutor::new(SiteId::new(site), urls, backend.clone())
            .with_edge_cache(backend.clone())
            .with_file_cache(backend),
    )
}

fn editing(touch_links: bool) -> PropagationTask {
    PropagationTask {
        page_name: "Editing".to_string(),
        touch_links,
    }
}

#[tokio::test]
async fn created_page_is_purged_on_every_site() {
    let config = hub_config();
    let queue = Arc::new(InMemoryJobQueue::new());
    let dispatcher = Arc::new(InvalidationDispatcher::new(
        &config,
        Arc::new(StaticSiteRegistry::from_config(&config)),
        queue.clone(),
    ));
    let site_a = RecordingPurgeBackend::new();
    let site_b = RecordingPurgeBackend::new();
    let router = JobRouter::new(dispatcher.clone())
        .with_executor(executor("site_a", site_a.clone()))
        .with_executor(executor("site_b", site_b.clone()));

    let outcome = dispatcher.dispatch(&created("Editing")).await.unwrap();
    assert_eq!(outcome, DispatchOutcome::Queued(editing(true)));

    let report = JobRunner::new(queue.clone(), Arc::new(router))
        .run_until_idle()
        .await;
    assert_eq!(report.rounds, 2);
    assert_eq!(report.jobs_run, 3);
    assert_eq!(queue.total_pending().await, 0);

    for backend in [&site_a, &site_b] {
        assert_both_pages_cleared(backend, "Editing");
        assert_eq!(
            backend.purged_edges(),
            vec!["Help:Editing", "Help talk:Editing"]
        );
        assert_eq!(backend.touched_links(), vec!["Help:Editing"]);
    }
}

#[tokio::test]
async fn link_changing_edit_refreshes_links_on_every_site() {
    let config = hub_config();
    let queue = Arc::new(InMemoryJobQueue::new());
    let dispatcher = Arc::new(InvalidationDispatcher::new(
        &config,
        Arc::new(StaticSiteRegistry::from_config(&config)),
        queue.clone(),
    ));
    let site_a = RecordingPurgeBackend::new();
    let site_b = RecordingPurgeBackend::new();
    let router = JobRouter::new(dispatcher.clone())
        .with_executor(executor("site_a", site_a.clone()))
        .with_executor(executor("site_b", site_b.clone()));

    let outcome = dispatcher.dispatch(&edited("Editing", true)).await.unwrap();
    assert_eq!(outcome, DispatchOutcome::Queued(editing(true)));

    let report = JobRunner::new(queue.clone(), Arc::new(router))
        .run_until_idle()
        .await;
    assert_eq!(report.jobs_run, 3);
    assert_eq!(report.crashed_workers, 0);
    assert_eq!(queue.total_pending().await, 0);

    for backend in [&site_a, &site_b] {
        assert_both_pages_cleared(backend, "Editing");
        assert_eq!(
            backend.purged_edges(),
            vec!["Help:Editing", "Help talk:Editing"]
        );
        // The talk page is cleared but its links are left alone.
        assert_eq!(backend.touched_links(), vec!["Help:Editing"]);
    }
}

#[tokio::test]
async fn plain_edit_skips_link_refresh() {
    let config = hub_config();
    let queue = Arc::new(InMemoryJobQueue::new());
    let dispatcher = Arc::new(InvalidationDispatcher::new(
        &config,
        Arc::new(StaticSiteRegistry::from_config(&config)),
        queue.clone(),
    ));
    let site_a = RecordingPurgeBackend::new();
    let router = JobRouter::new(dispatcher.clone()).with_executor(executor("site_a", site_a.clone()));

    dispatcher.dispatch(&edited("Editing", false)).await.unwrap();
    JobRunner::new(queue, Arc::new(router)).run_until_idle().await;

    assert_both_pages_cleared(&site_a, "Editing");
    assert!(site_a.touched_links().is_empty());
}

#[tokio::test]
async fn one_failing_site_does_not_stop_fan_out() {
    let config = hub_config();
    let queue = RecordingJobQueue::new();
    queue.fail_site("site_c");
    let sites = ["site_a", "site_b", "site_c", "site_d"]
        .into_iter()
        .map(SiteId::new)
        .collect();
    let dispatcher =
        InvalidationDispatcher::new(&config, Arc::new(StaticSiteRegistry::new(sites)), queue.clone());

    let report = dispatcher.fan_out(&editing(false)).await;

    assert_eq!(report.state, DispatchState::Terminal);
    assert_eq!(report.attempted(), 4);
    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.failed[0].0, SiteId::new("site_c"));
    for site in ["site_a", "site_b", "site_d"] {
        assert_site_purge_queued(&queue, site, "Editing", false);
    }
}

#[tokio::test]
async fn running_a_site_purge_twice_repeats_the_same_evictions() {
    let backend = RecordingPurgeBackend::new();
    let executor = executor("site_a", backend.clone());
    let task = SitePurgeTask {
        page_name: "Editing".to_string(),
        touch_links: true,
    };

    let first = executor.run(&task).await;
    let after_first = backend.calls();
    let second = executor.run(&task).await;

    assert_eq!(first, second);
    let calls = backend.calls();
    assert_eq!(calls.len(), after_first.len() * 2);
    assert_eq!(&calls[after_first.len()..], after_first.as_slice());
    assert!(matches!(
        &calls[0],
        PurgeCall::Edge { urls, .. } if urls[0] == "http://site_a.shoutwiki.com/wiki/Help:Editing"
    ));
}

#[tokio::test]
async fn mirror_sites_do_not_dispatch() {
    let config = mirror_config("site_a");
    let queue = RecordingJobQueue::new();
    let dispatcher = InvalidationDispatcher::new(
        &config,
        Arc::new(StaticSiteRegistry::new(vec![SiteId::new("site_b")])),
        queue.clone(),
    );

    let outcome = dispatcher.dispatch(&created("Editing")).await.unwrap();
    assert_eq!(outcome, DispatchOutcome::Ineligible);
    assert!(queue.is_empty());
}

proptest! {
    #[test]
    fn prop_fan_out_enqueues_once_per_site(sites in arb_site_ids(16)) {
        let runtime = tokio::runtime::Builder::new_current_thread().build().unwrap();
        let queue = RecordingJobQueue::new();
        let dispatcher = InvalidationDispatcher::new(
            &hub_config(),
            Arc::new(StaticSiteRegistry::new(sites.clone())),
            queue.clone(),
        );

        let report = runtime.block_on(dispatcher.fan_out(&editing(true)));

        prop_assert_eq!(report.enqueued, sites.clone());
        prop_assert!(report.failed.is_empty());
        let jobs = queue.jobs();
        prop_assert_eq!(jobs.len(), sites.len());
        for (site, job) in jobs {
            prop_assert!(sites.contains(&site));
            prop_assert_eq!(job, Job::SitePurge(SitePurgeTask {
                page_name: "Editing".to_string(),
                touch_links: true,
            }));
        }
    }
}
