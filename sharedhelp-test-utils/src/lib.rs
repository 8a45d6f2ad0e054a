//! SharedHelp Test Utilities
//!
//! Centralized test infrastructure for the SharedHelp workspace:
//! - Scripted authority, render source and touched store for the read side
//! - Recording queue and purge backends for the write side
//! - Proptest generators for titles, sites and markers
//! - Fixtures for common scenarios
//! - Assertions for purge and queue outcomes

pub use sharedhelp_core::{
    ChangeKind, Clock, FetchError, FreshnessMarker, Job, MirrorConfig, PageChanged,
    PropagationTask, PurgeError, PurgeLayer, QueueError, RenderResult, SiteId, SitePurgeTask,
    Timestamp, Title,
};

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use serde_json::{json, Value};
use sharedhelp_mirror::RenderSource;
use sharedhelp_propagation::{step_failure, EdgeCache, FileCache, JobQueue, LinkTable};
use sharedhelp_remote::{check_api_error, AuthorityClient, TouchedStore};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

// ============================================================================
// CLOCK
// ============================================================================

/// Clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<Timestamp>,
}

impl ManualClock {
    /// Starts at 2024-01-01T00:00:00Z.
    pub fn new() -> Arc<Self> {
        Self::at(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap())
    }

    pub fn at(start: Timestamp) -> Arc<Self> {
        Arc::new(Self {
            now: Mutex::new(start),
        })
    }

    pub fn advance(&self, by: Duration) {
        let by = chrono::Duration::from_std(by).expect("duration in range");
        *self.now.lock().unwrap() += by;
    }

    pub fn advance_secs(&self, secs: u64) {
        self.advance(Duration::from_secs(secs));
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Timestamp {
        *self.now.lock().unwrap()
    }
}

// ============================================================================
// READ SIDE MOCKS
// ============================================================================

#[derive(Debug, Clone)]
struct ScriptedPage {
    touched: String,
    html: String,
    modules: Vec<String>,
}

#[derive(Debug, Default)]
struct HubState {
    namespaces: Option<(String, String)>,
    pages: HashMap<String, ScriptedPage>,
    down: bool,
}

/// In-memory authority speaking the hub's API.
///
/// Answers parse, siteinfo and page info requests from scripted pages keyed
/// by prefixed title (`Help:Editing`). Every request is recorded. Bodies
/// carrying an API `error` object are rejected the same way the HTTP client
/// rejects them.
#[derive(Debug)]
pub struct ScriptedAuthority {
    state: Mutex<HubState>,
    calls: Mutex<Vec<Vec<(String, String)>>>,
}

impl Default for ScriptedAuthority {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptedAuthority {
    /// A hub whose project namespaces are `ShoutWiki` / `ShoutWiki_talk`.
    pub fn new() -> Self {
        Self {
            state: Mutex::new(HubState {
                namespaces: Some(("ShoutWiki".to_string(), "ShoutWiki talk".to_string())),
                ..HubState::default()
            }),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn with_page(self, page: &str, touched: &str, html: &str) -> Self {
        self.set_page(page, touched, html);
        self
    }

    pub fn with_namespaces(self, project: &str, project_talk: &str) -> Self {
        self.state.lock().unwrap().namespaces =
            Some((project.to_string(), project_talk.to_string()));
        self
    }

    /// Siteinfo responses omit the project namespaces.
    pub fn without_namespaces(self) -> Self {
        self.state.lock().unwrap().namespaces = None;
        self
    }

    pub fn set_page(&self, page: &str, touched: &str, html: &str) {
        self.state.lock().unwrap().pages.insert(
            page.to_string(),
            ScriptedPage {
                touched: touched.to_string(),
                html: html.to_string(),
                modules: vec!["ext.smw.style".to_string(), "mediawiki.page.ready".to_string()],
            },
        );
    }

    pub fn remove_page(&self, page: &str) {
        self.state.lock().unwrap().pages.remove(page);
    }

    /// While down, every request fails at the transport level.
    pub fn set_down(&self, down: bool) {
        self.state.lock().unwrap().down = down;
    }

    pub fn calls(&self) -> Vec<Vec<(String, String)>> {
        self.calls.lock().unwrap().clone()
    }

    /// Requests whose `action` is `action` (`parse`, `query`).
    pub fn call_count(&self, action: &str) -> usize {
        self.calls()
            .iter()
            .filter(|params| param(params, "action") == Some(action))
            .count()
    }

    fn answer(&self, params: &[(String, String)]) -> Result<Value, FetchError> {
        let state = self.state.lock().unwrap();
        if state.down {
            return Err(FetchError::TransportFailure {
                url: "http://hub.test/w/api.php".to_string(),
                reason: "connection refused".to_string(),
            });
        }

        match param(params, "action") {
            Some("parse") => {
                let page = param(params, "title").unwrap_or_default();
                Ok(match state.pages.get(page) {
                    Some(scripted) => fixtures::parse_response(&scripted.html, &scripted.modules),
                    None => fixtures::api_error_response(
                        "missingtitle",
                        "The page you specified doesn't exist.",
                    ),
                })
            }
            Some("query") if param(params, "meta") == Some("siteinfo") => {
                Ok(match &state.namespaces {
                    Some((project, talk)) => fixtures::siteinfo_response(project, talk),
                    None => json!({"query": {"namespaces": {"0": {"id": 0, "*": ""}}}}),
                })
            }
            Some("query") => {
                let page = param(params, "titles").unwrap_or_default();
                let with_url = param(params, "inprop") == Some("url");
                Ok(match state.pages.get(page) {
                    Some(scripted) if with_url => json!({"query": {"pages": [{
                        "title": page,
                        "touched": scripted.touched,
                        "canonicalurl": format!(
                            "http://www.shoutwiki.com/wiki/{}",
                            page.replace(' ', "_")
                        ),
                    }]}}),
                    Some(scripted) => fixtures::info_response(page, Some(&scripted.touched)),
                    None => fixtures::info_response(page, None),
                })
            }
            other => Err(FetchError::InvalidResponse {
                reason: format!("unsupported action {:?}", other),
            }),
        }
    }
}

fn param<'a>(params: &'a [(String, String)], name: &str) -> Option<&'a str> {
    params
        .iter()
        .find(|(n, _)| n == name)
        .map(|(_, v)| v.as_str())
}

#[async_trait]
impl AuthorityClient for ScriptedAuthority {
    async fn request(&self, params: &[(&str, String)], _locale: &str) -> Result<Value, FetchError> {
        let owned: Vec<(String, String)> = params
            .iter()
            .map(|(n, v)| (n.to_string(), v.clone()))
            .collect();
        self.calls.lock().unwrap().push(owned.clone());
        check_api_error(self.answer(&owned)?)
    }
}

/// Render source with a swappable outcome and a call counter.
#[derive(Debug)]
pub struct ScriptedRenderSource {
    outcome: Mutex<Result<RenderResult, FetchError>>,
    calls: AtomicUsize,
}

impl ScriptedRenderSource {
    pub fn ok(html: &str) -> Arc<Self> {
        Arc::new(Self {
            outcome: Mutex::new(Ok(fixtures::sample_render(html))),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            outcome: Mutex::new(Err(fixtures::transport_failure())),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn succeed_with(&self, html: &str) {
        *self.outcome.lock().unwrap() = Ok(fixtures::sample_render(html));
    }

    pub fn fail(&self) {
        *self.outcome.lock().unwrap() = Err(fixtures::transport_failure());
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RenderSource for ScriptedRenderSource {
    async fn fetch(&self, _title: &Title, _locale: &str) -> Result<RenderResult, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.outcome.lock().unwrap().clone()
    }
}

/// Touched store over a map of prefixed title to marker.
///
/// Titles not in the map are missing on the authority.
#[derive(Debug, Default)]
pub struct FixedTouchedStore {
    markers: Mutex<HashMap<String, Result<FreshnessMarker, FetchError>>>,
    calls: AtomicUsize,
}

impl FixedTouchedStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn set(&self, page: &str, marker: &str) {
        self.markers
            .lock()
            .unwrap()
            .insert(page.to_string(), Ok(FreshnessMarker::new(marker)));
    }

    pub fn fail(&self, page: &str) {
        self.markers
            .lock()
            .unwrap()
            .insert(page.to_string(), Err(fixtures::transport_failure()));
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TouchedStore for FixedTouchedStore {
    async fn touched(&self, title: &Title) -> Result<Option<FreshnessMarker>, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.markers.lock().unwrap().get(&title.prefixed_text()) {
            Some(Ok(marker)) => Ok(Some(marker.clone())),
            Some(Err(e)) => Err(e.clone()),
            None => Ok(None),
        }
    }
}

// ============================================================================
// WRITE SIDE MOCKS
// ============================================================================

/// Job queue that records every accepted job and rejects chosen sites.
#[derive(Debug, Default)]
pub struct RecordingJobQueue {
    jobs: Mutex<Vec<(SiteId, Job)>>,
    failing: Mutex<HashSet<SiteId>>,
}

impl RecordingJobQueue {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Enqueues to `site` fail from now on.
    pub fn fail_site(&self, site: &str) {
        self.failing.lock().unwrap().insert(SiteId::new(site));
    }

    pub fn jobs(&self) -> Vec<(SiteId, Job)> {
        self.jobs.lock().unwrap().clone()
    }

    pub fn jobs_for(&self, site: &str) -> Vec<Job> {
        self.jobs()
            .into_iter()
            .filter(|(s, _)| s.as_str() == site)
            .map(|(_, job)| job)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.jobs.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl JobQueue for RecordingJobQueue {
    async fn enqueue(&self, site: &SiteId, job: Job) -> Result<(), QueueError> {
        if self.failing.lock().unwrap().contains(site) {
            return Err(QueueError::EnqueueFailed {
                site: site.to_string(),
                reason: "queue unavailable".to_string(),
            });
        }
        self.jobs.lock().unwrap().push((site.clone(), job));
        Ok(())
    }
}

/// One call made to a [`RecordingPurgeBackend`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PurgeCall {
    Edge { title: String, urls: Vec<String> },
    File { title: String },
    Links { title: String },
}

/// Edge cache, file cache and link table in one, recording every call.
#[derive(Debug, Default)]
pub struct RecordingPurgeBackend {
    calls: Mutex<Vec<PurgeCall>>,
    failing: Mutex<HashSet<PurgeLayer>>,
}

impl RecordingPurgeBackend {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Calls to `layer` fail from now on (still recorded).
    pub fn fail_layer(&self, layer: PurgeLayer) {
        self.failing.lock().unwrap().insert(layer);
    }

    pub fn calls(&self) -> Vec<PurgeCall> {
        self.calls.lock().unwrap().clone()
    }

    /// Titles whose file cache entry was cleared, in order.
    pub fn cleared_files(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                PurgeCall::File { title } => Some(title),
                _ => None,
            })
            .collect()
    }

    /// Titles whose edge cache entries were purged, in order.
    pub fn purged_edges(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                PurgeCall::Edge { title, .. } => Some(title),
                _ => None,
            })
            .collect()
    }

    /// Titles whose inbound links were refreshed, in order.
    pub fn touched_links(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                PurgeCall::Links { title } => Some(title),
                _ => None,
            })
            .collect()
    }

    fn record(&self, layer: PurgeLayer, title: &Title, call: PurgeCall) -> Result<(), PurgeError> {
        self.calls.lock().unwrap().push(call);
        if self.failing.lock().unwrap().contains(&layer) {
            return Err(step_failure(layer, title, "scripted failure"));
        }
        Ok(())
    }
}

#[async_trait]
impl EdgeCache for RecordingPurgeBackend {
    async fn purge(&self, title: &Title, urls: &[String]) -> Result<(), PurgeError> {
        self.record(
            PurgeLayer::EdgeCache,
            title,
            PurgeCall::Edge {
                title: title.prefixed_text(),
                urls: urls.to_vec(),
            },
        )
    }
}

#[async_trait]
impl FileCache for RecordingPurgeBackend {
    async fn clear(&self, title: &Title) -> Result<(), PurgeError> {
        self.record(
            PurgeLayer::FileCache,
            title,
            PurgeCall::File {
                title: title.prefixed_text(),
            },
        )
    }
}

#[async_trait]
impl LinkTable for RecordingPurgeBackend {
    async fn touch_links_to(&self, title: &Title) -> Result<(), PurgeError> {
        self.record(
            PurgeLayer::LinkTable,
            title,
            PurgeCall::Links {
                title: title.prefixed_text(),
            },
        )
    }
}

// ============================================================================
// PROPTEST GENERATORS
// ============================================================================

pub mod generators {
    //! Proptest strategies for SharedHelp types.

    use super::*;
    use proptest::collection::vec;
    use proptest::prelude::*;

    /// A valid help page name, possibly multi-word.
    pub fn arb_page_name() -> impl Strategy<Value = String> {
        "[A-Z][a-z]{1,10}( [a-z]{1,8}){0,2}"
    }

    /// A valid root help title.
    pub fn arb_help_title() -> impl Strategy<Value = Title> {
        arb_page_name().prop_filter_map("valid title", |name| Title::help(&name))
    }

    pub fn arb_locale() -> impl Strategy<Value = String> {
        prop_oneof![
            Just("en".to_string()),
            Just("fr".to_string()),
            Just("de".to_string()),
            Just("pt-br".to_string()),
            "[a-z]{2}",
        ]
    }

    /// A MediaWiki-style `touched` timestamp.
    pub fn arb_freshness_marker() -> impl Strategy<Value = FreshnessMarker> {
        "20[0-9]{2}(0[1-9]|1[0-2])[0-2][0-9][0-5][0-9]{5}".prop_map(FreshnessMarker::new)
    }

    pub fn arb_site_id() -> impl Strategy<Value = SiteId> {
        "[a-z]{2,12}_wiki".prop_map(SiteId::new)
    }

    /// Distinct site ids, up to `max` of them.
    pub fn arb_site_ids(max: usize) -> impl Strategy<Value = Vec<SiteId>> {
        proptest::collection::btree_set(arb_site_id(), 0..=max)
            .prop_map(|sites| sites.into_iter().collect())
    }

    pub fn arb_change_kind() -> impl Strategy<Value = ChangeKind> {
        prop_oneof![
            Just(ChangeKind::Created),
            any::<bool>().prop_map(|affects_links| ChangeKind::Edited { affects_links }),
            Just(ChangeKind::Deleted),
            Just(ChangeKind::Purged),
        ]
    }

    pub fn arb_page_changed() -> impl Strategy<Value = PageChanged> {
        (arb_help_title(), arb_change_kind())
            .prop_map(|(title, kind)| PageChanged::new(title, kind))
    }

    pub fn arb_render_result() -> impl Strategy<Value = RenderResult> {
        (
            "<p>[a-zA-Z ]{1,40}</p>",
            vec("ext\\.[a-z]{2,8}", 0..4),
            vec("ext\\.[a-z]{2,8}\\.styles", 0..3),
        )
            .prop_map(|(html, modules, styles)| {
                RenderResult::new(html, modules, styles, vec![], Default::default())
            })
    }
}

// ============================================================================
// TEST FIXTURES
// ============================================================================

pub mod fixtures {
    //! Pre-built values for common scenarios.

    use super::*;

    /// Configuration of the English hub itself.
    pub fn hub_config() -> MirrorConfig {
        MirrorConfig {
            sites: vec!["site_a".to_string(), "site_b".to_string()],
            ..MirrorConfig::default()
        }
    }

    /// Configuration of a dependent site reading from the English hub.
    pub fn mirror_config(site: &str) -> MirrorConfig {
        MirrorConfig {
            current_site: site.to_string(),
            server: format!("http://{}.shoutwiki.com", site.trim_end_matches("_wiki")),
            ..MirrorConfig::default()
        }
    }

    pub fn help_title(page: &str) -> Title {
        Title::help(page).expect("valid help page name")
    }

    pub fn sample_render(html: &str) -> RenderResult {
        RenderResult::new(
            html,
            vec!["ext.smw.style".to_string(), "mediawiki.page.ready".to_string()],
            vec!["ext.smw.style".to_string()],
            vec![],
            Default::default(),
        )
    }

    pub fn transport_failure() -> FetchError {
        FetchError::TransportFailure {
            url: "http://hub.test/w/api.php".to_string(),
            reason: "connection refused".to_string(),
        }
    }

    pub fn edited(page: &str, affects_links: bool) -> PageChanged {
        PageChanged::new(help_title(page), ChangeKind::Edited { affects_links })
    }

    pub fn created(page: &str) -> PageChanged {
        PageChanged::new(help_title(page), ChangeKind::Created)
    }

    /// Parse response in `formatversion=2` shape.
    pub fn parse_response(html: &str, modules: &[String]) -> Value {
        json!({"parse": {
            "title": "API",
            "text": html,
            "modules": modules,
            "modulestyles": [],
            "modulescripts": [],
            "jsconfigvars": [],
        }})
    }

    /// API error body, as returned with a 200 status.
    pub fn api_error_response(code: &str, info: &str) -> Value {
        json!({"error": {"code": code, "info": info}})
    }

    /// Siteinfo response with the project namespaces (4 and 5).
    pub fn siteinfo_response(project: &str, project_talk: &str) -> Value {
        json!({"query": {"namespaces": {
            "4": {"id": 4, "*": project},
            "5": {"id": 5, "*": project_talk},
            "12": {"id": 12, "*": "Help"},
            "13": {"id": 13, "*": "Help talk"},
        }}})
    }

    /// Page info response; `touched: None` means the page is missing.
    pub fn info_response(page: &str, touched: Option<&str>) -> Value {
        match touched {
            Some(touched) => json!({"query": {"pages": [
                {"pageid": 1, "ns": 12, "title": page, "touched": touched}
            ]}}),
            None => json!({"query": {"pages": [
                {"ns": 12, "title": page, "missing": true}
            ]}}),
        }
    }
}

// ============================================================================
// CUSTOM ASSERTIONS
// ============================================================================

pub mod assertions {
    //! Assertions over recorded purge calls and queued jobs.

    use super::*;

    /// Assert that `page` and its talk page were purged from the file cache.
    #[track_caller]
    pub fn assert_both_pages_cleared(backend: &RecordingPurgeBackend, page: &str) {
        let title = fixtures::help_title(page);
        let cleared = backend.cleared_files();
        for expected in [title.prefixed_text(), title.other_page().prefixed_text()] {
            assert!(
                cleared.contains(&expected),
                "Expected {} to be cleared, got: {:?}",
                expected,
                cleared
            );
        }
    }

    /// Assert exactly one site purge for `page` was queued on `site`.
    #[track_caller]
    pub fn assert_site_purge_queued(
        queue: &RecordingJobQueue,
        site: &str,
        page: &str,
        touch_links: bool,
    ) {
        let jobs = queue.jobs_for(site);
        let expected = Job::SitePurge(SitePurgeTask {
            page_name: page.to_string(),
            touch_links,
        });
        assert_eq!(jobs, vec![expected], "Unexpected jobs for {}", site);
    }

    /// Assert that a fetch error is a transport failure.
    #[track_caller]
    pub fn assert_transport_failure<T: std::fmt::Debug>(result: &Result<T, FetchError>) {
        match result {
            Err(FetchError::TransportFailure { .. }) => {}
            other => panic!("Expected TransportFailure, got: {:?}", other),
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================
