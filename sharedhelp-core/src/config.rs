//! Configuration for mirroring and invalidation.
//!
//! Loaded from a TOML file (`--config <path>` or `SHAREDHELP_CONFIG`), then
//! overridden from `SHAREDHELP_*` environment variables, then validated.
//! Every field has a default so a partial file is enough.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::SiteId;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MirrorConfig {
    /// Database name of the default authority (the English hub).
    pub hub_database: String,
    /// Database name of the site this process serves.
    pub current_site: String,
    /// Content language of this site.
    pub content_language: String,
    /// Languages that have their own hub (`{lang}_wiki`).
    pub supported_languages: Vec<String>,
    /// API endpoint of the default hub.
    pub api_url: String,
    /// API endpoint of a language hub; `{lang}` is replaced by the code.
    pub language_api_url_template: String,
    pub request_timeout_secs: u64,
    /// Lifetime of a successful render.
    pub content_ttl_secs: u64,
    /// Lifetime of a failed render. Short: it throttles retries against a
    /// failing authority but delays recovery by at most this long.
    pub negative_ttl_secs: u64,
    pub namespace_ttl_secs: u64,
    /// Lifetime of a freshness marker; bounds how long stale content is served.
    pub freshness_ttl_secs: u64,
    /// Capacity of per-process memo caches.
    pub memo_capacity: usize,
    /// Skip the existence check and point `/wiki/` links at `article_path`.
    pub development_mode: bool,
    /// Scheme and host of this site, used to build purge URLs.
    pub server: String,
    pub article_path: String,
    pub script_path: String,
    pub use_edge_cache: bool,
    pub use_file_cache: bool,
    /// Root directory of the static HTML file cache.
    pub file_cache_directory: Option<PathBuf>,
    /// Dependent sites, used when no other registry is supplied.
    pub sites: Vec<String>,
    /// This site's project namespace name, underscored.
    pub local_project_namespace: String,
    /// This site's project talk namespace name, underscored.
    pub local_project_talk_namespace: String,
}

impl Default for MirrorConfig {
    fn default() -> Self {
        Self {
            hub_database: "shoutwiki".to_string(),
            current_site: "shoutwiki".to_string(),
            content_language: "en".to_string(),
            supported_languages: Vec::new(),
            api_url: "http://www.shoutwiki.com/w/api.php".to_string(),
            language_api_url_template: "http://{lang}.shoutwiki.com/w/api.php".to_string(),
            request_timeout_secs: 10,
            content_ttl_secs: 86_400,
            negative_ttl_secs: 10,
            namespace_ttl_secs: 7 * 86_400,
            freshness_ttl_secs: 30,
            memo_capacity: 100,
            development_mode: false,
            server: "http://localhost".to_string(),
            article_path: "/wiki/$1".to_string(),
            script_path: "/w".to_string(),
            use_edge_cache: true,
            use_file_cache: false,
            file_cache_directory: None,
            sites: Vec::new(),
            local_project_namespace: "Project".to_string(),
            local_project_talk_namespace: "Project_talk".to_string(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Invalid config value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },
}

impl MirrorConfig {
    /// Load from the configured path (or defaults), apply env overrides, validate.
    pub fn load() -> Result<Self, ConfigError> {
        let path = config_path_from_args().or_else(config_path_from_env);
        let mut config = match path {
            Some(path) => Self::from_path(&path)?,
            None => Self::default(),
        };
        config.apply_env();
        config.validate()?;
        Ok(config)
    }

    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml(&contents)
    }

    pub fn from_toml(contents: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(contents)?)
    }

    /// Override selected fields from environment variables.
    ///
    /// - `SHAREDHELP_CURRENT_SITE`
    /// - `SHAREDHELP_CONTENT_LANGUAGE`
    /// - `SHAREDHELP_API_URL`
    /// - `SHAREDHELP_SITES` (comma-separated)
    /// - `SHAREDHELP_DEVELOPMENT_MODE` ("true" / "false")
    pub fn apply_env(&mut self) {
        if let Ok(site) = std::env::var("SHAREDHELP_CURRENT_SITE") {
            self.current_site = site;
        }
        if let Ok(lang) = std::env::var("SHAREDHELP_CONTENT_LANGUAGE") {
            self.content_language = lang;
        }
        if let Ok(url) = std::env::var("SHAREDHELP_API_URL") {
            self.api_url = url;
        }
        if let Ok(sites) = std::env::var("SHAREDHELP_SITES") {
            self.sites = sites
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
        }
        if let Ok(dev) = std::env::var("SHAREDHELP_DEVELOPMENT_MODE") {
            self.development_mode = dev.to_lowercase() == "true";
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        non_empty("hub_database", &self.hub_database)?;
        non_empty("current_site", &self.current_site)?;
        non_empty("content_language", &self.content_language)?;
        non_empty("api_url", &self.api_url)?;
        non_empty("server", &self.server)?;
        non_empty("local_project_namespace", &self.local_project_namespace)?;
        non_empty("local_project_talk_namespace", &self.local_project_talk_namespace)?;

        if !self.language_api_url_template.contains("{lang}") {
            return Err(ConfigError::InvalidValue {
                field: "language_api_url_template",
                reason: "must contain {lang}".to_string(),
            });
        }
        if !self.article_path.contains("$1") {
            return Err(ConfigError::InvalidValue {
                field: "article_path",
                reason: "must contain $1".to_string(),
            });
        }

        positive("request_timeout_secs", self.request_timeout_secs)?;
        positive("content_ttl_secs", self.content_ttl_secs)?;
        positive("negative_ttl_secs", self.negative_ttl_secs)?;
        positive("namespace_ttl_secs", self.namespace_ttl_secs)?;
        positive("freshness_ttl_secs", self.freshness_ttl_secs)?;
        positive("memo_capacity", self.memo_capacity as u64)?;

        if self.use_file_cache && self.file_cache_directory.is_none() {
            return Err(ConfigError::InvalidValue {
                field: "file_cache_directory",
                reason: "required when use_file_cache is true".to_string(),
            });
        }

        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn content_ttl(&self) -> Duration {
        Duration::from_secs(self.content_ttl_secs)
    }

    pub fn negative_ttl(&self) -> Duration {
        Duration::from_secs(self.negative_ttl_secs)
    }

    pub fn namespace_ttl(&self) -> Duration {
        Duration::from_secs(self.namespace_ttl_secs)
    }

    pub fn freshness_ttl(&self) -> Duration {
        Duration::from_secs(self.freshness_ttl_secs)
    }

    pub fn current_site_id(&self) -> SiteId {
        SiteId::new(self.current_site.clone())
    }

    pub fn site_ids(&self) -> Vec<SiteId> {
        self.sites.iter().map(|s| SiteId::new(s.clone())).collect()
    }

    /// Article path with the `$1` placeholder removed (`/wiki/`).
    pub fn article_path_base(&self) -> String {
        self.article_path.replace("$1", "")
    }
}

fn non_empty(field: &'static str, value: &str) -> Result<(), ConfigError> {
    if value.trim().is_empty() {
        return Err(ConfigError::InvalidValue {
            field,
            reason: "must not be empty".to_string(),
        });
    }
    Ok(())
}

fn positive(field: &'static str, value: u64) -> Result<(), ConfigError> {
    if value == 0 {
        return Err(ConfigError::InvalidValue {
            field,
            reason: "must be > 0".to_string(),
        });
    }
    Ok(())
}

fn config_path_from_args() -> Option<PathBuf> {
    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        if arg == "--config" {
            return args.next().map(PathBuf::from);
        }
    }
    None
}

fn config_path_from_env() -> Option<PathBuf> {
    std::env::var("SHAREDHELP_CONFIG").ok().map(PathBuf::from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_are_valid() {
        let config = MirrorConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.negative_ttl(), Duration::from_secs(10));
        assert_eq!(config.namespace_ttl(), Duration::from_secs(7 * 86_400));
        assert_eq!(config.article_path_base(), "/wiki/");
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = MirrorConfig::from_toml(
            r#"
            current_site = "dnd_wiki"
            sites = ["a_wiki", "b_wiki"]
            content_ttl_secs = 3600
            "#,
        )
        .unwrap();
        assert_eq!(config.current_site, "dnd_wiki");
        assert_eq!(config.site_ids(), vec![SiteId::new("a_wiki"), SiteId::new("b_wiki")]);
        assert_eq!(config.content_ttl(), Duration::from_secs(3600));
        assert_eq!(config.hub_database, "shoutwiki");
    }

    #[test]
    fn test_unknown_fields_rejected() {
        let err = MirrorConfig::from_toml("not_a_field = 1").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_from_path() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "development_mode = true").unwrap();
        let config = MirrorConfig::from_path(file.path()).unwrap();
        assert!(config.development_mode);
    }

    #[test]
    fn test_validate_rejects_zero_ttl() {
        let config = MirrorConfig {
            negative_ttl_secs: 0,
            ..MirrorConfig::default()
        };
        let err = config.validate().unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidValue { field: "negative_ttl_secs", .. }
        ));
    }

    #[test]
    fn test_validate_rejects_template_without_placeholder() {
        let config = MirrorConfig {
            language_api_url_template: "http://hub/w/api.php".to_string(),
            ..MirrorConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_requires_file_cache_directory() {
        let config = MirrorConfig {
            use_file_cache: true,
            ..MirrorConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
