//! Where the render cache gets content on a miss.

use async_trait::async_trait;
use sharedhelp_core::{FetchError, RenderResult, Title};
use sharedhelp_remote::RemoteContentFetcher;

/// Produces a fresh render of a page.
#[async_trait]
pub trait RenderSource: Send + Sync {
    async fn fetch(&self, title: &Title, locale: &str) -> Result<RenderResult, FetchError>;
}

#[async_trait]
impl RenderSource for RemoteContentFetcher {
    async fn fetch(&self, title: &Title, locale: &str) -> Result<RenderResult, FetchError> {
        RemoteContentFetcher::fetch(self, title, locale).await
    }
}
