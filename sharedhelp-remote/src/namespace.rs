//! Project namespace names as the authority knows them.
//!
//! Rendered help text links to the authority's project namespace
//! (`ShoutWiki:About`); mirrors rewrite those links to their own project
//! namespace. The names are effectively static, so each locale's pair is
//! cached for days and fetched in one siteinfo query on a miss.

use serde_json::Value;
use sharedhelp_core::{CacheKey, MetadataError, NamespaceTranslationPair};
use sharedhelp_storage::{get_json, set_json, CacheStore};
use std::sync::Arc;
use std::time::Duration;

use crate::AuthorityClient;

/// Namespace id of the project namespace.
const PROJECT_NS: &str = "4";
/// Namespace id of the project talk namespace.
const PROJECT_TALK_NS: &str = "5";

/// Cache-or-fetch resolver of [`NamespaceTranslationPair`]s.
pub struct NamespaceTranslationCache {
    client: Arc<dyn AuthorityClient>,
    store: Arc<dyn CacheStore>,
    ttl: Duration,
}

impl NamespaceTranslationCache {
    pub fn new(client: Arc<dyn AuthorityClient>, store: Arc<dyn CacheStore>, ttl: Duration) -> Self {
        Self { client, store, ttl }
    }

    /// The authority's project/project-talk names for `locale`.
    ///
    /// Both halves are stored together or not at all; a partial answer is
    /// returned as an error and retried on the next call.
    pub async fn resolve(&self, locale: &str) -> Result<NamespaceTranslationPair, MetadataError> {
        let key = CacheKey::namespace_pair(locale);
        match get_json::<NamespaceTranslationPair>(self.store.as_ref(), &key).await {
            Ok(Some(pair)) => {
                tracing::debug!(locale, "Namespace pair cache hit");
                return Ok(pair);
            }
            Ok(None) => {}
            Err(e) => {
                tracing::warn!(locale, error = %e, "Namespace pair cache read failed, refetching");
            }
        }

        let pair = self.fetch(locale).await?;
        if let Err(e) = set_json(self.store.as_ref(), &key, &pair, Some(self.ttl)).await {
            tracing::warn!(locale, error = %e, "Failed to cache namespace pair");
        }
        Ok(pair)
    }

    async fn fetch(&self, locale: &str) -> Result<NamespaceTranslationPair, MetadataError> {
        let params = [
            ("action", "query".to_string()),
            ("meta", "siteinfo".to_string()),
            ("siprop", "namespaces|namespacealiases".to_string()),
        ];
        let body = self
            .client
            .request(&params, locale)
            .await
            .map_err(|e| MetadataError::Unavailable {
                locale: locale.to_string(),
                reason: e.to_string(),
            })?;
        parse_namespace_pair(&body, locale)
    }
}

/// Extract the project pair from a siteinfo response.
pub fn parse_namespace_pair(body: &Value, locale: &str) -> Result<NamespaceTranslationPair, MetadataError> {
    let namespaces = body.pointer("/query/namespaces");
    let project = namespaces.and_then(|ns| namespace_name(ns, PROJECT_NS));
    let project_talk = namespaces.and_then(|ns| namespace_name(ns, PROJECT_TALK_NS));

    match (project, project_talk) {
        (Some(project), Some(project_talk)) => {
            Ok(NamespaceTranslationPair::new(project, project_talk))
        }
        (project, project_talk) => {
            let missing = [
                project.is_none().then_some("project"),
                project_talk.is_none().then_some("project_talk"),
            ]
            .into_iter()
            .flatten()
            .collect::<Vec<_>>()
            .join(", ");
            Err(MetadataError::PartialMetadata {
                locale: locale.to_string(),
                missing,
            })
        }
    }
}

/// Name of namespace `id`: `*` in the legacy format, `name` in the newer one.
fn namespace_name<'a>(namespaces: &'a Value, id: &str) -> Option<&'a str> {
    let entry = namespaces.get(id)?;
    entry
        .get("*")
        .or_else(|| entry.get("name"))
        .and_then(Value::as_str)
        .filter(|name| !name.trim().is_empty())
}
