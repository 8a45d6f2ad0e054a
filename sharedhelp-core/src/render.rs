//! Render results and the values stored for them in the cache.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::FreshnessMarker;

/// Rendered authority page plus the resources it needs on the client.
///
/// Module lists are ordered sets: insertion order is kept, duplicates dropped.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RenderResult {
    pub html: String,
    pub modules: Vec<String>,
    pub module_styles: Vec<String>,
    pub module_scripts: Vec<String>,
    pub js_config_vars: Map<String, Value>,
}

impl RenderResult {
    pub fn new(
        html: impl Into<String>,
        modules: Vec<String>,
        module_styles: Vec<String>,
        module_scripts: Vec<String>,
        js_config_vars: Map<String, Value>,
    ) -> Self {
        Self {
            html: html.into(),
            modules: ordered_set(modules),
            module_styles: ordered_set(module_styles),
            module_scripts: ordered_set(module_scripts),
            js_config_vars,
        }
    }

    /// Blank HTML counts as "nothing to show", same as a failed fetch.
    pub fn is_usable(&self) -> bool {
        !self.html.trim().is_empty()
    }

    /// Copy with every module list reduced to the modules `is_registered` accepts.
    ///
    /// Modules the authority loads may not exist on the local site.
    pub fn retain_modules<F>(&self, is_registered: F) -> Self
    where
        F: Fn(&str) -> bool,
    {
        let keep = |list: &[String]| -> Vec<String> {
            list.iter()
                .filter(|m| is_registered(m.as_str()))
                .cloned()
                .collect()
        };
        Self {
            html: self.html.clone(),
            modules: keep(&self.modules),
            module_styles: keep(&self.module_styles),
            module_scripts: keep(&self.module_scripts),
            js_config_vars: self.js_config_vars.clone(),
        }
    }

    /// Append a style module unless already present.
    pub fn add_module_style(&mut self, module: &str) {
        if !self.module_styles.iter().any(|m| m == module) {
            self.module_styles.push(module.to_string());
        }
    }
}

fn ordered_set(items: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(items.len());
    for item in items {
        if !out.contains(&item) {
            out.push(item);
        }
    }
    out
}

/// What the content cache stores under a render key.
///
/// `Failed` is the negative entry: "we asked recently and got nothing".
/// It is distinct from the key being absent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CachedRender {
    Rendered { result: RenderResult },
    Failed,
}

/// Authority-side names of the project and project-talk namespaces for one
/// locale, in underscored (wikitext-visible) form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamespaceTranslationPair {
    pub project: String,
    pub project_talk: String,
}

impl NamespaceTranslationPair {
    pub fn new(project: &str, project_talk: &str) -> Self {
        Self {
            project: project.replace(' ', "_"),
            project_talk: project_talk.replace(' ', "_"),
        }
    }
}

/// What the freshness oracle stores: a marker, or the knowledge that the page
/// has none (does not exist, or could not be looked up).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedMarker {
    pub marker: Option<FreshnessMarker>,
}
