//! In-crate fakes for unit tests.

use async_trait::async_trait;
use sharedhelp_core::{FetchError, FreshnessMarker, RenderResult, Title};
use sharedhelp_remote::TouchedStore;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use crate::RenderSource;

/// Render source that returns a fixed outcome and counts calls.
pub struct FixedSource {
    outcome: Mutex<Result<RenderResult, FetchError>>,
    calls: AtomicUsize,
}

impl FixedSource {
    pub fn ok(html: &str) -> Arc<Self> {
        Arc::new(Self {
            outcome: Mutex::new(Ok(RenderResult::new(
                html,
                vec!["ext.known".to_string(), "ext.unknown".to_string()],
                vec![],
                vec![],
                Default::default(),
            ))),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            outcome: Mutex::new(Err(FetchError::TransportFailure {
                url: "http://hub".to_string(),
                reason: "down".to_string(),
            })),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn set_ok(&self, html: &str) {
        *self.outcome.lock().unwrap() = Ok(RenderResult::new(
            html,
            vec![],
            vec![],
            vec![],
            Default::default(),
        ));
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RenderSource for FixedSource {
    async fn fetch(&self, _title: &Title, _locale: &str) -> Result<RenderResult, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.outcome.lock().unwrap().clone()
    }
}

/// Touched store backed by a map; pages not in the map are missing.
#[derive(Default)]
pub struct MapTouched {
    pages: Mutex<HashMap<String, Result<FreshnessMarker, FetchError>>>,
    calls: AtomicUsize,
}

impl MapTouched {
    pub fn with(page: &str, marker: &str) -> Arc<Self> {
        let touched = Self::default();
        touched.set(page, marker);
        Arc::new(touched)
    }

    pub fn set(&self, page: &str, marker: &str) {
        self.pages
            .lock()
            .unwrap()
            .insert(page.to_string(), Ok(FreshnessMarker::new(marker)));
    }

    pub fn fail(&self, page: &str) {
        self.pages.lock().unwrap().insert(
            page.to_string(),
            Err(FetchError::InvalidResponse {
                reason: "db error".to_string(),
            }),
        );
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TouchedStore for MapTouched {
    async fn touched(&self, title: &Title) -> Result<Option<FreshnessMarker>, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.pages.lock().unwrap().get(&title.prefixed_text()) {
            Some(Ok(marker)) => Ok(Some(marker.clone())),
            Some(Err(e)) => Err(e.clone()),
            None => Ok(None),
        }
    }
}
