//! Production purge backends.

use async_trait::async_trait;
use reqwest::{Client, Method};
use sharedhelp_core::{fingerprint, PurgeError, PurgeLayer, Title};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::executor::{step_failure, EdgeCache, FileCache, LinkTable};

fn http_client(timeout: Duration) -> Result<Client, reqwest::Error> {
    Client::builder()
        .timeout(timeout)
        .user_agent(concat!("sharedhelp/", env!("CARGO_PKG_VERSION")))
        .build()
}

/// Edge cache purged with HTTP `PURGE` requests.
///
/// Every URL is attempted; the first failure is reported after all have run.
pub struct HttpEdgeCache {
    client: Client,
}

impl HttpEdgeCache {
    pub fn new(timeout: Duration) -> Result<Self, reqwest::Error> {
        Ok(Self {
            client: http_client(timeout)?,
        })
    }
}

#[async_trait]
impl EdgeCache for HttpEdgeCache {
    async fn purge(&self, title: &Title, urls: &[String]) -> Result<(), PurgeError> {
        let method = Method::from_bytes(b"PURGE")
            .map_err(|e| step_failure(PurgeLayer::EdgeCache, title, e.to_string()))?;
        let mut first_error = None;

        for url in urls {
            let outcome = self.client.request(method.clone(), url).send().await;
            let failure = match outcome {
                // A 404 just means the URL was not cached.
                Ok(response)
                    if response.status().is_success() || response.status().as_u16() == 404 =>
                {
                    None
                }
                Ok(response) => Some(format!("{} returned {}", url, response.status())),
                Err(e) => Some(format!("{}: {}", url, e)),
            };
            if let Some(reason) = failure {
                tracing::debug!(url = %url, reason = %reason, "Edge purge request failed");
                first_error.get_or_insert_with(|| step_failure(PurgeLayer::EdgeCache, title, reason));
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

/// Static HTML snapshots stored under a directory.
///
/// Layout: `<root>/<h>/<hh>/<Prefixed_title>.html` where `h`/`hh` are the
/// first one and two hex digits of the SHA-256 of the prefixed title.
#[derive(Debug, Clone)]
pub struct DirectoryFileCache {
    root: PathBuf,
}

impl DirectoryFileCache {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of the snapshot of `title`.
    pub fn path_for(&self, title: &Title) -> PathBuf {
        let key = title.prefixed_db_key();
        let hash = fingerprint(&key);
        let file_name = format!("{}.html", urlencoding::encode(&key));
        self.root.join(&hash[..1]).join(&hash[..2]).join(file_name)
    }
}

#[async_trait]
impl FileCache for DirectoryFileCache {
    async fn clear(&self, title: &Title) -> Result<(), PurgeError> {
        let path = self.path_for(title);
        match tokio::fs::remove_file(&path).await {
            Ok(()) => {
                tracing::debug!(path = %path.display(), "Removed file cache snapshot");
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(step_failure(
                PurgeLayer::FileCache,
                title,
                format!("{}: {}", path.display(), e),
            )),
        }
    }
}

/// Link refresh through the site's own API.
///
/// Asks the site to purge `title` with a forced link update, which re-renders
/// it and invalidates pages linking to it.
pub struct ApiLinkTable {
    client: Client,
    api_url: String,
}

impl ApiLinkTable {
    pub fn new(api_url: impl Into<String>, timeout: Duration) -> Result<Self, reqwest::Error> {
        Ok(Self {
            client: http_client(timeout)?,
            api_url: api_url.into(),
        })
    }
}

#[async_trait]
impl LinkTable for ApiLinkTable {
    async fn touch_links_to(&self, title: &Title) -> Result<(), PurgeError> {
        let form = [
            ("action", "purge".to_string()),
            ("titles", title.prefixed_text()),
            ("forcerecursivelinkupdate", "1".to_string()),
            ("format", "json".to_string()),
        ];
        let response = self
            .client
            .post(&self.api_url)
            .form(&form)
            .send()
            .await
            .map_err(|e| step_failure(PurgeLayer::LinkTable, title, e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(step_failure(
                PurgeLayer::LinkTable,
                title,
                format!("{} returned {}", self.api_url, status),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_cache_layout() {
        let cache = DirectoryFileCache::new("/var/cache/html");
        let title = Title::help("Getting started").unwrap();
        let path = cache.path_for(&title);
        let hash = fingerprint("Help:Getting_started");

        assert!(path.starts_with("/var/cache/html"));
        assert_eq!(
            path.parent().unwrap(),
            Path::new("/var/cache/html").join(&hash[..1]).join(&hash[..2])
        );
        assert_eq!(path.file_name().unwrap(), "Help%3AGetting_started.html");
    }

    #[tokio::test]
    async fn test_clear_removes_snapshot_and_tolerates_absence() {
        let dir = tempfile::tempdir().unwrap();
        let cache = DirectoryFileCache::new(dir.path());
        let title = Title::help("Editing").unwrap();
        let path = cache.path_for(&title);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, "<html></html>").unwrap();

        cache.clear(&title).await.unwrap();
        assert!(!path.exists());
        // Second clear is a no-op.
        cache.clear(&title).await.unwrap();
    }

    #[tokio::test]
    async fn test_unreachable_edge_reports_failure() {
        let edge = HttpEdgeCache::new(Duration::from_secs(2)).unwrap();
        let title = Title::help("Editing").unwrap();
        let err = edge
            .purge(&title, &["http://127.0.0.1:9/wiki/Help:Editing".to_string()])
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            PurgeError::PurgeStepFailure {
                layer: PurgeLayer::EdgeCache,
                ..
            }
        ));
    }
}
