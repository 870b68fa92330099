//! Upstream integrations
//!
//! An `Upstream` knows how to fetch the raw response for a partition key and
//! how to shape that response into the records the cache stores. The cache
//! engine is generic over this trait and never looks inside the records.

mod http;
pub mod news;
pub mod restaurants;

pub use http::{HttpFetcher, REQUEST_TIMEOUT};
pub use news::NewsUpstream;
pub use restaurants::RestaurantUpstream;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

/// Errors that can occur when calling an upstream API
///
/// All variants mean the upstream was unavailable for this attempt. The type
/// is `Clone` so one failed fetch can be handed to every caller waiting on it.
#[derive(Debug, Clone, Error)]
pub enum UpstreamError {
    /// The request never produced a response (DNS, connect, timeout, ...)
    #[error("could not retrieve data from {upstream}: {detail}")]
    Transport {
        upstream: &'static str,
        detail: String,
    },

    /// The upstream answered with a non-success status
    #[error("could not retrieve data from {upstream}: HTTP {status}: {detail}")]
    Status {
        upstream: &'static str,
        status: u16,
        detail: String,
    },

    /// The upstream answered 2xx but the body was not JSON
    #[error("could not retrieve data from {upstream}: invalid response body: {detail}")]
    Decode {
        upstream: &'static str,
        detail: String,
    },

    /// The HTTP client for the upstream could not be constructed
    #[error("could not build HTTP client for {upstream}: {detail}")]
    Client {
        upstream: &'static str,
        detail: String,
    },
}

impl UpstreamError {
    /// Name of the upstream that failed
    pub fn upstream(&self) -> &'static str {
        match self {
            UpstreamError::Transport { upstream, .. }
            | UpstreamError::Status { upstream, .. }
            | UpstreamError::Decode { upstream, .. }
            | UpstreamError::Client { upstream, .. } => upstream,
        }
    }
}

/// A third-party API whose responses are cached by partition key
#[async_trait]
pub trait Upstream: Send + Sync {
    /// Short name used in logs and error messages
    fn name(&self) -> &'static str;

    /// Performs one request for the partition identified by `key`
    async fn fetch(&self, key: &str) -> Result<Value, UpstreamError>;

    /// Turns a raw response into the records stored for `key`
    ///
    /// Must be pure: no I/O and no failure. Anything unusable is dropped.
    fn shape(&self, key: &str, raw: Value) -> Vec<Value>;
}
