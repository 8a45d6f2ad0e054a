//! Error types for mirroring and invalidation.
//!
//! None of these are user-fatal. Fetch failures are collapsed into negative
//! cache entries, purge failures are logged per step and per site.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::config::ConfigError;

/// Failures talking to the authority.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FetchError {
    #[error("Request to {url} failed: {reason}")]
    TransportFailure { url: String, reason: String },

    #[error("Request to {url} returned status {status}")]
    NonSuccessStatus { url: String, status: u16 },

    #[error("Invalid response from authority: {reason}")]
    InvalidResponse { reason: String },

    #[error("Authority returned no content for {page}")]
    EmptyContent { page: String },

    #[error("Namespace metadata unavailable: {0}")]
    Metadata(#[from] MetadataError),
}

/// Failures resolving namespace display names.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum MetadataError {
    #[error("Namespace metadata for {locale} is missing {missing}")]
    PartialMetadata { locale: String, missing: String },

    #[error("Namespace metadata request for {locale} failed: {reason}")]
    Unavailable { locale: String, reason: String },
}

/// Cache layers cleared on a dependent site.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PurgeLayer {
    EdgeCache,
    FileCache,
    LinkTable,
}

impl fmt::Display for PurgeLayer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::EdgeCache => "edge cache",
            Self::FileCache => "file cache",
            Self::LinkTable => "link table",
        };
        f.write_str(name)
    }
}

/// A single purge step failed.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PurgeError {
    #[error("Purging {layer} for {title} failed: {reason}")]
    PurgeStepFailure {
        layer: PurgeLayer,
        title: String,
        reason: String,
    },
}

/// Failures handing work to the execution runtime.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum QueueError {
    #[error("Enqueue to {site} failed: {reason}")]
    EnqueueFailed { site: String, reason: String },

    #[error("No queue for site {site}")]
    UnknownSite { site: String },
}

/// Cache store failures.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("Cache value (de)serialization failed: {reason}")]
    Serialization { reason: String },

    #[error("Cache backend error: {reason}")]
    Backend { reason: String },
}

/// Master error type.
#[derive(Debug, Clone, Error)]
pub enum MirrorError {
    #[error("Fetch error: {0}")]
    Fetch(#[from] FetchError),

    #[error("Metadata error: {0}")]
    Metadata(#[from] MetadataError),

    #[error("Purge error: {0}")]
    Purge(#[from] PurgeError),

    #[error("Queue error: {0}")]
    Queue(#[from] QueueError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Config error: {0}")]
    Config(String),
}

impl From<ConfigError> for MirrorError {
    fn from(err: ConfigError) -> Self {
        Self::Config(err.to_string())
    }
}

/// Result type alias for mirroring operations.
pub type MirrorResult<T> = Result<T, MirrorError>;

// =============================================================================
// TESTS
// =============================================================================
