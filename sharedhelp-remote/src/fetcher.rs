//! Rendering a help page on the authority.

use serde_json::{Map, Value};
use sharedhelp_core::{FetchError, MirrorConfig, NamespaceTranslationPair, RenderResult, Title};
use std::sync::Arc;

use crate::{AuthorityClient, NamespaceTranslationCache};

/// Fetches rendered help pages and adapts them to the local site.
///
/// One parse request returns the HTML plus the module lists and client
/// config variables. Project namespace links in the HTML are then rewritten
/// from the authority's names to this site's names.
pub struct RemoteContentFetcher {
    client: Arc<dyn AuthorityClient>,
    namespaces: Arc<NamespaceTranslationCache>,
    local_names: NamespaceTranslationPair,
    /// Set in development mode: `/wiki/` links are pointed here instead.
    local_article_base: Option<String>,
}

impl RemoteContentFetcher {
    pub fn new(
        client: Arc<dyn AuthorityClient>,
        namespaces: Arc<NamespaceTranslationCache>,
        local_names: NamespaceTranslationPair,
    ) -> Self {
        Self {
            client,
            namespaces,
            local_names,
            local_article_base: None,
        }
    }

    pub fn from_config(
        client: Arc<dyn AuthorityClient>,
        namespaces: Arc<NamespaceTranslationCache>,
        config: &MirrorConfig,
    ) -> Self {
        let local_names = NamespaceTranslationPair::new(
            &config.local_project_namespace,
            &config.local_project_talk_namespace,
        );
        let fetcher = Self::new(client, namespaces, local_names);
        if config.development_mode {
            fetcher.with_local_article_base(config.article_path_base())
        } else {
            fetcher
        }
    }

    /// Rewrite `href="/wiki/` links to `base` (development mode).
    pub fn with_local_article_base(mut self, base: impl Into<String>) -> Self {
        self.local_article_base = Some(base.into());
        self
    }

    /// Render `title` in `locale` on the authority.
    ///
    /// Transport errors, error statuses and blank HTML are all failures;
    /// so is a namespace pair that cannot be resolved, since un-rewritten
    /// HTML would link to the wrong namespace.
    pub async fn fetch(&self, title: &Title, locale: &str) -> Result<RenderResult, FetchError> {
        let page = title.prefixed_text();
        let body = self.client.request(&render_params(title, locale), locale).await?;
        let mut result = parse_render_response(&body, &page)?;

        let remote_names = self.namespaces.resolve(locale).await?;
        result.html = rewrite_namespaces(&result.html, &remote_names, &self.local_names);
        if let Some(base) = &self.local_article_base {
            result.html = rewrite_article_links(&result.html, base);
        }

        tracing::debug!(page = %page, locale, bytes = result.html.len(), "Fetched remote render");
        Ok(result)
    }
}

/// Parameters of the parse request for `title`.
///
/// The page is transcluded rather than parsed by title so the authority
/// renders it exactly as a reader would see it.
pub fn render_params(title: &Title, locale: &str) -> Vec<(&'static str, String)> {
    let page = title.prefixed_text();
    vec![
        ("action", "parse".to_string()),
        ("title", page.clone()),
        ("text", format!("{{{{:{}}}}}", page)),
        ("disableeditsection", "1".to_string()),
        ("disablelimitreport", "1".to_string()),
        ("prop", "text|modules|jsconfigvars".to_string()),
        ("formatversion", "2".to_string()),
        ("uselang", locale.to_string()),
    ]
}

/// Build a [`RenderResult`] from a parse response.
pub fn parse_render_response(body: &Value, page: &str) -> Result<RenderResult, FetchError> {
    let parse = body.get("parse").ok_or_else(|| FetchError::InvalidResponse {
        reason: "missing parse section".to_string(),
    })?;

    // formatversion=2 returns a string; the legacy format wraps it in {"*": ...}.
    let html = match parse.get("text") {
        Some(Value::String(text)) => text.clone(),
        Some(Value::Object(wrapped)) => wrapped
            .get("*")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
        _ => String::new(),
    };

    let result = RenderResult::new(
        html,
        string_list(parse, "modules"),
        string_list(parse, "modulestyles"),
        string_list(parse, "modulescripts"),
        config_vars(parse),
    );
    if !result.is_usable() {
        return Err(FetchError::EmptyContent {
            page: page.to_string(),
        });
    }
    Ok(result)
}

fn string_list(parse: &Value, field: &str) -> Vec<String> {
    parse
        .get(field)
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

// An empty config comes back as `[]` rather than `{}`.
fn config_vars(parse: &Value) -> Map<String, Value> {
    match parse.get("jsconfigvars") {
        Some(Value::Object(vars)) => vars.clone(),
        _ => Map::new(),
    }
}

/// Replace `"<remote project>:"` with `"<local project>:"`, then the same
/// for the talk namespace.
///
/// Plain substring replacement over the whole document: any text that
/// happens to contain the remote prefix is rewritten too.
pub fn rewrite_namespaces(
    html: &str,
    remote: &NamespaceTranslationPair,
    local: &NamespaceTranslationPair,
) -> String {
    html.replace(&format!("{}:", remote.project), &format!("{}:", local.project))
        .replace(
            &format!("{}:", remote.project_talk),
            &format!("{}:", local.project_talk),
        )
}

/// Point `href="/wiki/` links at the local article path.
pub fn rewrite_article_links(html: &str, article_base: &str) -> String {
    html.replace("href=\"/wiki/", &format!("href=\"{}", article_base))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::CannedAuthority;
    use serde_json::json;
    use sharedhelp_core::MetadataError;
    use sharedhelp_storage::InMemoryCacheStore;
    use std::time::Duration;

    fn siteinfo() -> Value {
        json!({"query": {"namespaces": {
            "4": {"*": "ShoutWiki"},
            "5": {"*": "ShoutWiki talk"}
        }}})
    }

    fn parsed(html: &str) -> Value {
        json!({"parse": {
            "title": "Help:Editing",
            "text": html,
            "modules": ["ext.a", "ext.b"],
            "modulestyles": ["ext.a.styles"],
            "modulescripts": [],
            "jsconfigvars": []
        }})
    }

    fn fetcher(authority: Arc<CannedAuthority>) -> RemoteContentFetcher {
        let store = Arc::new(InMemoryCacheStore::default());
        let namespaces = Arc::new(NamespaceTranslationCache::new(
            authority.clone(),
            store,
            Duration::from_secs(60),
        ));
        RemoteContentFetcher::new(
            authority,
            namespaces,
            NamespaceTranslationPair::new("Dnd Wiki", "Dnd Wiki talk"),
        )
    }

    #[test]
    fn test_render_params() {
        let title = Title::help("Editing").unwrap();
        let params = render_params(&title, "fr");
        let get = |name: &str| {
            params
                .iter()
                .find(|(n, _)| *n == name)
                .map(|(_, v)| v.as_str())
        };
        assert_eq!(get("action"), Some("parse"));
        assert_eq!(get("title"), Some("Help:Editing"));
        assert_eq!(get("text"), Some("{{:Help:Editing}}"));
        assert_eq!(get("prop"), Some("text|modules|jsconfigvars"));
        assert_eq!(get("formatversion"), Some("2"));
        assert_eq!(get("uselang"), Some("fr"));
    }

    #[tokio::test]
    async fn test_fetch_rewrites_namespaces() {
        let html = r#"<a href="/wiki/ShoutWiki:About">ShoutWiki:About</a> <a href="/wiki/ShoutWiki_talk:About">x</a>"#;
        let authority = Arc::new(
            CannedAuthority::new()
                .on("parse", Ok(parsed(html)))
                .on("siteinfo", Ok(siteinfo())),
        );
        let result = fetcher(authority)
            .fetch(&Title::help("Editing").unwrap(), "en")
            .await
            .unwrap();

        assert!(result.html.contains("/wiki/Dnd_Wiki:About"));
        assert!(result.html.contains("/wiki/Dnd_Wiki_talk:About"));
        assert!(!result.html.contains("ShoutWiki_talk:"));
        assert_eq!(result.modules, vec!["ext.a".to_string(), "ext.b".to_string()]);
        assert!(result.js_config_vars.is_empty());
    }

    #[tokio::test]
    async fn test_empty_html_is_failure() {
        let authority = Arc::new(
            CannedAuthority::new()
                .on("parse", Ok(parsed("   ")))
                .on("siteinfo", Ok(siteinfo())),
        );
        let err = fetcher(authority.clone())
            .fetch(&Title::help("Editing").unwrap(), "en")
            .await
            .unwrap_err();
        assert_eq!(
            err,
            FetchError::EmptyContent {
                page: "Help:Editing".to_string()
            }
        );
        // No point resolving namespaces for content that will not be served.
        assert_eq!(authority.call_count("siteinfo"), 0);
    }

    #[tokio::test]
    async fn test_transport_failure_propagates() {
        let authority = Arc::new(CannedAuthority::new().on(
            "parse",
            Err(FetchError::TransportFailure {
                url: "u".to_string(),
                reason: "timed out".to_string(),
            }),
        ));
        let err = fetcher(authority)
            .fetch(&Title::help("Editing").unwrap(), "en")
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::TransportFailure { .. }));
    }

    #[tokio::test]
    async fn test_unresolved_namespaces_fail_the_fetch() {
        let authority = Arc::new(
            CannedAuthority::new()
                .on("parse", Ok(parsed("<p>ok</p>")))
                .on("siteinfo", Ok(json!({"query": {"namespaces": {}}}))),
        );
        let err = fetcher(authority)
            .fetch(&Title::help("Editing").unwrap(), "en")
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            FetchError::Metadata(MetadataError::PartialMetadata { .. })
        ));
    }

    #[tokio::test]
    async fn test_development_mode_rewrites_article_links() {
        let authority = Arc::new(
            CannedAuthority::new()
                .on("parse", Ok(parsed(r#"<a href="/wiki/Help:Tables">t</a>"#)))
                .on("siteinfo", Ok(siteinfo())),
        );
        let result = fetcher(authority)
            .with_local_article_base("/index.php/")
            .fetch(&Title::help("Editing").unwrap(), "en")
            .await
            .unwrap();
        assert!(result.html.contains(r#"href="/index.php/Help:Tables""#));
    }

    #[test]
    fn test_legacy_text_format() {
        let body = json!({"parse": {"text": {"*": "<p>legacy</p>"}, "jsconfigvars": {"wgX": 1}}});
        let result = parse_render_response(&body, "Help:X").unwrap();
        assert_eq!(result.html, "<p>legacy</p>");
        assert_eq!(result.js_config_vars.get("wgX"), Some(&json!(1)));
    }

    #[test]
    fn test_missing_parse_section() {
        let err = parse_render_response(&json!({"batchcomplete": true}), "Help:X").unwrap_err();
        assert!(matches!(err, FetchError::InvalidResponse { .. }));
    }

    #[test]
    fn test_rewrite_is_plain_substring() {
        let remote = NamespaceTranslationPair::new("Hub", "Hub talk");
        let local = NamespaceTranslationPair::new("Local", "Local talk");
        // Known limitation: unrelated text with the prefix is rewritten too.
        let out = rewrite_namespaces("see https://x/Hub:y and Hub_talk:z", &remote, &local);
        assert_eq!(out, "see https://x/Local:y and Local_talk:z");
    }
}
