//! Authority API client.

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use sharedhelp_core::{FetchError, HubResolver, MirrorConfig};

/// Request/response access to the authority's API.
///
/// `params` are the query parameters of a single API call; `locale`
/// selects which authority answers (language hubs have their own endpoint).
/// Implementations return the decoded JSON body on success.
#[async_trait]
pub trait AuthorityClient: Send + Sync {
    async fn request(&self, params: &[(&str, String)], locale: &str) -> Result<Value, FetchError>;
}

/// [`AuthorityClient`] over HTTP.
pub struct HttpAuthorityClient {
    client: Client,
    hubs: HubResolver,
}

impl HttpAuthorityClient {
    pub fn new(config: &MirrorConfig) -> Result<Self, FetchError> {
        let client = Client::builder()
            .timeout(config.request_timeout())
            .user_agent(concat!("sharedhelp/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| FetchError::TransportFailure {
                url: config.api_url.clone(),
                reason: format!("Failed to build HTTP client: {}", e),
            })?;
        Ok(Self {
            client,
            hubs: HubResolver::new(config),
        })
    }
}

#[async_trait]
impl AuthorityClient for HttpAuthorityClient {
    async fn request(&self, params: &[(&str, String)], locale: &str) -> Result<Value, FetchError> {
        let url = self.hubs.api_url(locale);
        let action = params
            .iter()
            .find(|(name, _)| *name == "action")
            .map(|(_, value)| value.as_str())
            .unwrap_or("");
        tracing::debug!(url = %url, action, locale, "Authority request");

        let response = self
            .client
            .get(&url)
            .query(params)
            .query(&[("format", "json")])
            .send()
            .await
            .map_err(|e| FetchError::TransportFailure {
                url: url.clone(),
                reason: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::NonSuccessStatus {
                url,
                status: status.as_u16(),
            });
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| FetchError::InvalidResponse {
                reason: format!("Failed to parse response from {}: {}", url, e),
            })?;
        check_api_error(body)
    }
}

/// Reject bodies that carry an API-level `error` object.
///
/// The authority reports bad requests with a success status and an error
/// payload, so a 200 is not enough.
pub fn check_api_error(body: Value) -> Result<Value, FetchError> {
    if let Some(error) = body.get("error") {
        let code = error.get("code").and_then(Value::as_str).unwrap_or("unknown");
        let info = error
            .get("info")
            .and_then(Value::as_str)
            .unwrap_or("no details");
        return Err(FetchError::InvalidResponse {
            reason: format!("{}: {}", code, info),
        });
    }
    Ok(body)
}

impl std::fmt::Debug for HttpAuthorityClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpAuthorityClient")
            .field("hubs", &self.hubs)
            .finish()
    }
}
