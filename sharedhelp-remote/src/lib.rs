//! SharedHelp Remote - Talking to the Authority
//!
//! Everything that crosses the network to the hub: the API client, the
//! namespace-name translation cache, the render fetcher with its link
//! rewriting, page freshness lookups and source URL resolution.

pub mod client;
pub mod fetcher;
pub mod namespace;
pub mod source_url;
pub mod touched;

#[cfg(test)]
mod testing;

pub use client::{check_api_error, AuthorityClient, HttpAuthorityClient};
pub use fetcher::{
    parse_render_response, render_params, rewrite_article_links, rewrite_namespaces,
    RemoteContentFetcher,
};
pub use namespace::{parse_namespace_pair, NamespaceTranslationCache};
pub use source_url::SourceUrlResolver;
pub use touched::{parse_touched, ApiTouchedStore, TouchedStore};
