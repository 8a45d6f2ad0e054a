//! Which site is the authority for a given language, and where its API lives.

use crate::{MirrorConfig, SiteId};

/// English variants always use the default hub.
const ENGLISH_VARIANTS: &[&str] = &["en", "en-gb", "en-ca"];

/// Resolves the authority site and API endpoint from the language code.
///
/// Languages listed in `supported_languages` (other than English) have their
/// own hub named `{lang}_wiki`; everything else falls back to the default hub.
#[derive(Debug, Clone)]
pub struct HubResolver {
    default_hub: String,
    current_site: String,
    content_language: String,
    supported_languages: Vec<String>,
    api_url: String,
    language_api_url_template: String,
}

impl HubResolver {
    pub fn new(config: &MirrorConfig) -> Self {
        Self {
            default_hub: config.hub_database.clone(),
            current_site: config.current_site.clone(),
            content_language: config.content_language.clone(),
            supported_languages: config.supported_languages.clone(),
            api_url: config.api_url.clone(),
            language_api_url_template: config.language_api_url_template.clone(),
        }
    }

    fn has_own_hub(&self, lang: &str) -> bool {
        lang != "en" && self.supported_languages.iter().any(|l| l == lang)
    }

    /// Authority database for `lang`.
    pub fn hub_for(&self, lang: &str) -> SiteId {
        if self.has_own_hub(lang) {
            SiteId::new(format!("{}_wiki", lang))
        } else {
            SiteId::new(self.default_hub.clone())
        }
    }

    /// Authority database for this site's content language.
    pub fn authority(&self) -> SiteId {
        self.hub_for(&self.content_language)
    }

    /// True when this process is running on the authority itself.
    pub fn is_authority(&self) -> bool {
        self.authority().as_str() == self.current_site
    }

    /// Whether mirrored help exists for this site's content language.
    pub fn is_supported_language(&self) -> bool {
        let lang = self.content_language.as_str();
        ENGLISH_VARIANTS.contains(&lang) || self.supported_languages.iter().any(|l| l == lang)
    }

    /// API endpoint to query for content in `locale`.
    pub fn api_url(&self, locale: &str) -> String {
        if self.has_own_hub(locale) {
            self.language_api_url_template.replace("{lang}", locale)
        } else {
            self.api_url.clone()
        }
    }
}
