//! Page titles and the namespaces mirrored content lives in.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Characters that can never appear in a page title.
const ILLEGAL_TITLE_CHARS: &[char] = &['#', '<', '>', '[', ']', '|', '{', '}'];

/// Namespaces relevant to mirroring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Namespace {
    Help,
    HelpTalk,
    Other(i32),
}

impl Namespace {
    /// Numeric namespace id.
    pub fn id(self) -> i32 {
        match self {
            Self::Help => 12,
            Self::HelpTalk => 13,
            Self::Other(id) => id,
        }
    }

    pub fn from_id(id: i32) -> Self {
        match id {
            12 => Self::Help,
            13 => Self::HelpTalk,
            other => Self::Other(other),
        }
    }

    /// Canonical (unlocalized) display name, `None` for namespaces we don't name.
    pub fn canonical_name(self) -> Option<&'static str> {
        match self {
            Self::Help => Some("Help"),
            Self::HelpTalk => Some("Help talk"),
            Self::Other(_) => None,
        }
    }

    /// The paired subject/talk namespace.
    ///
    /// Help pages and their talk pages share tab colouring, so purging one
    /// means purging the other.
    pub fn counterpart(self) -> Self {
        match self {
            Self::Help => Self::HelpTalk,
            Self::HelpTalk => Self::Help,
            Self::Other(id) if id >= 0 && id % 2 == 0 => Self::Other(id + 1),
            Self::Other(id) if id > 0 => Self::Other(id - 1),
            other => other,
        }
    }

    fn from_prefix(prefix: &str) -> Option<Self> {
        match prefix.replace('_', " ").to_lowercase().as_str() {
            "help" => Some(Self::Help),
            "help talk" => Some(Self::HelpTalk),
            _ => None,
        }
    }
}

/// A normalized page title: namespace plus page text in display form.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Title {
    namespace: Namespace,
    text: String,
}

impl Title {
    /// Build a title in `namespace`, normalizing the page text.
    ///
    /// Returns `None` when the text is empty or contains characters that are
    /// never valid in a title.
    pub fn new(namespace: Namespace, text: &str) -> Option<Self> {
        let normalized = normalize_text(text)?;
        Some(Self {
            namespace,
            text: normalized,
        })
    }

    /// Title of the Help page called `page_name`.
    pub fn help(page_name: &str) -> Option<Self> {
        Self::new(Namespace::Help, page_name)
    }

    /// Parse a prefixed title such as `Help:Editing` or `Help_talk:Editing`.
    ///
    /// Unknown prefixes are treated as part of the text in namespace `Other(0)`.
    pub fn parse(prefixed: &str) -> Option<Self> {
        if let Some((prefix, rest)) = prefixed.split_once(':') {
            if let Some(namespace) = Namespace::from_prefix(prefix.trim()) {
                return Self::new(namespace, rest);
            }
        }
        Self::new(Namespace::Other(0), prefixed)
    }

    pub fn namespace(&self) -> Namespace {
        self.namespace
    }

    /// Page text without namespace, spaces preserved (`Getting started`).
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Page text in database form (`Getting_started`).
    pub fn db_key(&self) -> String {
        self.text.replace(' ', "_")
    }

    /// `Help:Getting started`.
    pub fn prefixed_text(&self) -> String {
        match self.namespace.canonical_name() {
            Some(name) => format!("{}:{}", name, self.text),
            None => self.text.clone(),
        }
    }

    /// `Help:Getting_started`, the form used in URLs.
    pub fn prefixed_db_key(&self) -> String {
        self.prefixed_text().replace(' ', "_")
    }

    pub fn in_namespace(&self, namespace: Namespace) -> bool {
        self.namespace == namespace
    }

    /// The same page in the paired namespace (Help <-> Help talk).
    pub fn other_page(&self) -> Self {
        Self {
            namespace: self.namespace.counterpart(),
            text: self.text.clone(),
        }
    }

    /// True when this is not a subpage (`Help:Editing`, not `Help:Editing/Tables`).
    pub fn is_root(&self) -> bool {
        !self.text.contains('/')
    }
}

impl fmt::Display for Title {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.prefixed_text())
    }
}

fn normalize_text(text: &str) -> Option<String> {
    let spaced = text.replace('_', " ");
    let collapsed = spaced.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.is_empty() || collapsed.contains(ILLEGAL_TITLE_CHARS) {
        return None;
    }

    let mut chars = collapsed.chars();
    let first = chars.next()?;
    Some(first.to_uppercase().chain(chars).collect())
}
