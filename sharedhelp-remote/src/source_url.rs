//! Canonical URL of the authority copy of a page.
//!
//! Mirrored pages link back to their source. The URL never changes for a
//! given page, so a resolved URL is cached without expiry; failures are not
//! cached and resolve to an empty string.

use serde_json::Value;
use sharedhelp_core::{CacheKey, Title};
use sharedhelp_storage::{get_json, set_json, CacheStore};
use std::sync::Arc;

use crate::AuthorityClient;

pub struct SourceUrlResolver {
    client: Arc<dyn AuthorityClient>,
    store: Arc<dyn CacheStore>,
}

impl SourceUrlResolver {
    pub fn new(client: Arc<dyn AuthorityClient>, store: Arc<dyn CacheStore>) -> Self {
        Self { client, store }
    }

    /// Canonical authority URL of `title`, or `""` if it cannot be found.
    pub async fn resolve(&self, title: &Title, locale: &str) -> String {
        let key = CacheKey::source_url(title);
        match get_json::<String>(self.store.as_ref(), &key).await {
            Ok(Some(url)) => return url,
            Ok(None) => {}
            Err(e) => tracing::warn!(page = %title, error = %e, "Source URL cache read failed"),
        }

        let params = [
            ("action", "query".to_string()),
            ("prop", "info".to_string()),
            ("inprop", "url".to_string()),
            ("titles", title.prefixed_text()),
            ("formatversion", "2".to_string()),
        ];
        let url = match self.client.request(&params, locale).await {
            Ok(body) => canonical_url(&body),
            Err(e) => {
                tracing::warn!(page = %title, locale, error = %e, "Source URL lookup failed");
                None
            }
        };

        match url {
            Some(url) => {
                if let Err(e) = set_json(self.store.as_ref(), &key, &url, None).await {
                    tracing::warn!(page = %title, error = %e, "Failed to cache source URL");
                }
                url
            }
            None => String::new(),
        }
    }
}

fn canonical_url(body: &Value) -> Option<String> {
    body.pointer("/query/pages/0/canonicalurl")
        .and_then(Value::as_str)
        .filter(|url| !url.is_empty())
        .map(str::to_string)
}
