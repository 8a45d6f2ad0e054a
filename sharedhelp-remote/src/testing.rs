//! In-crate fakes for unit tests.

use async_trait::async_trait;
use serde_json::Value;
use sharedhelp_core::FetchError;
use std::collections::VecDeque;
use std::sync::Mutex;

use crate::AuthorityClient;

/// Authority that answers by the `action`/`meta`/`prop` of each request.
///
/// Each route holds a queue of replies; the last reply repeats.
#[derive(Default)]
pub struct CannedAuthority {
    routes: Mutex<Vec<(String, VecDeque<Result<Value, FetchError>>)>>,
    calls: Mutex<Vec<Vec<(String, String)>>>,
}

impl CannedAuthority {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on(self, route: &str, reply: Result<Value, FetchError>) -> Self {
        {
            let mut routes = self.routes.lock().unwrap();
            match routes.iter_mut().find(|(r, _)| r == route) {
                Some((_, replies)) => replies.push_back(reply),
                None => routes.push((route.to_string(), VecDeque::from([reply]))),
            }
        }
        self
    }

    pub fn calls(&self) -> Vec<Vec<(String, String)>> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self, route: &str) -> usize {
        self.calls()
            .iter()
            .filter(|params| route_of(params) == route)
            .count()
    }
}

fn route_of(params: &[(String, String)]) -> String {
    let get = |name: &str| {
        params
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.clone())
    };
    match get("action").as_deref() {
        Some("parse") => "parse".to_string(),
        Some("query") if get("meta").is_some() => "siteinfo".to_string(),
        Some("query") if get("inprop").is_some() => "url".to_string(),
        Some("query") => "info".to_string(),
        _ => "other".to_string(),
    }
}

#[async_trait]
impl AuthorityClient for CannedAuthority {
    async fn request(&self, params: &[(&str, String)], _locale: &str) -> Result<Value, FetchError> {
        let owned: Vec<(String, String)> = params
            .iter()
            .map(|(n, v)| (n.to_string(), v.clone()))
            .collect();
        let route = route_of(&owned);
        self.calls.lock().unwrap().push(owned);

        let mut routes = self.routes.lock().unwrap();
        let replies = routes
            .iter_mut()
            .find(|(r, _)| *r == route)
            .map(|(_, replies)| replies);
        match replies {
            Some(replies) if replies.len() > 1 => replies.pop_front().unwrap(),
            Some(replies) => replies.front().cloned().unwrap(),
            None => Err(FetchError::TransportFailure {
                url: "canned".to_string(),
                reason: format!("no reply for {}", route),
            }),
        }
    }
}
