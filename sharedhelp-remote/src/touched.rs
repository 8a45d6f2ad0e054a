//! Last-modified markers of authority pages.

use async_trait::async_trait;
use serde_json::Value;
use sharedhelp_core::{FetchError, FreshnessMarker, Title};
use std::sync::Arc;

use crate::AuthorityClient;

/// The authority's record of when each page last changed.
///
/// `Ok(None)` means the page does not exist.
#[async_trait]
pub trait TouchedStore: Send + Sync {
    async fn touched(&self, title: &Title) -> Result<Option<FreshnessMarker>, FetchError>;
}

/// [`TouchedStore`] answered by the authority's page info API.
pub struct ApiTouchedStore {
    client: Arc<dyn AuthorityClient>,
    locale: String,
}

impl ApiTouchedStore {
    pub fn new(client: Arc<dyn AuthorityClient>, locale: impl Into<String>) -> Self {
        Self {
            client,
            locale: locale.into(),
        }
    }
}

#[async_trait]
impl TouchedStore for ApiTouchedStore {
    async fn touched(&self, title: &Title) -> Result<Option<FreshnessMarker>, FetchError> {
        let params = [
            ("action", "query".to_string()),
            ("prop", "info".to_string()),
            ("titles", title.prefixed_text()),
            ("formatversion", "2".to_string()),
        ];
        let body = self.client.request(&params, &self.locale).await?;
        parse_touched(&body)
    }
}

/// Read `query.pages[0].touched`, or `None` when the page is missing.
pub fn parse_touched(body: &Value) -> Result<Option<FreshnessMarker>, FetchError> {
    let page = body
        .pointer("/query/pages/0")
        .ok_or_else(|| FetchError::InvalidResponse {
            reason: "missing query.pages".to_string(),
        })?;

    if page.get("missing").is_some() || page.get("invalid").is_some() {
        return Ok(None);
    }
    match page.get("touched").and_then(Value::as_str) {
        Some(touched) => Ok(Some(FreshnessMarker::new(touched))),
        None => Err(FetchError::InvalidResponse {
            reason: "page info has no touched field".to_string(),
        }),
    }
}
