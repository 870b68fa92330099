//! Shared HTTP plumbing for upstream clients

use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, CONTENT_TYPE};
use reqwest::{Client, ClientBuilder};
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

use super::UpstreamError;

/// Upper bound on a single upstream request
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// Issues JSON GET requests against one upstream base URL
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    /// HTTP client for making requests
    client: Client,
    /// Base URL without trailing slash
    base_url: String,
    /// Upstream name for logs and errors
    upstream: &'static str,
}

impl HttpFetcher {
    /// Creates a fetcher for `base_url` with the given request timeout
    ///
    /// # Errors
    /// Returns `UpstreamError::Client` if the HTTP client cannot be built.
    pub fn new(
        upstream: &'static str,
        base_url: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, UpstreamError> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let client = build_client(
            upstream,
            Client::builder().timeout(timeout).default_headers(headers),
        )?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            upstream,
        })
    }

    /// Base URL requests are sent to
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Full URL for `path` under the base URL
    pub fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// Sends one GET request and decodes the JSON body
    ///
    /// Transport failures, non-2xx statuses and undecodable bodies all map to
    /// `UpstreamError`. There is no retry.
    pub async fn get_json(&self, path: &str, query: &[(&str, String)]) -> Result<Value, UpstreamError> {
        let url = self.url(path);
        debug!(upstream = self.upstream, %url, "Requesting upstream");

        let response = self
            .client
            .get(&url)
            .query(query)
            .send()
            .await
            .map_err(|e| UpstreamError::Transport {
                upstream: self.upstream,
                detail: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(UpstreamError::Status {
                upstream: self.upstream,
                status: status.as_u16(),
                detail: error_detail(&body)
                    .unwrap_or_else(|| status.canonical_reason().unwrap_or("request failed").to_string()),
            });
        }

        response.json::<Value>().await.map_err(|e| UpstreamError::Decode {
            upstream: self.upstream,
            detail: e.to_string(),
        })
    }
}

fn build_client(upstream: &'static str, builder: ClientBuilder) -> Result<Client, UpstreamError> {
    builder.build().map_err(|e| UpstreamError::Client {
        upstream,
        detail: e.to_string(),
    })
}

/// Extracts the upstream's own error message from an error body, if it has one
fn error_detail(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    value
        .get("message")
        .and_then(Value::as_str)
        .filter(|message| !message.is_empty())
        .map(str::to_string)
}
