//! Ministry of Environment vegetarian restaurant registry
//!
//! Partitions are city names, plus `all` for the unfiltered registry.

use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;

use super::{HttpFetcher, Upstream, UpstreamError};

/// Default base URL of the open-data API
pub const DEFAULT_BASE_URL: &str = "https://data.moenv.gov.tw/api/v2";

/// Dataset path under the base URL
const DATASET_PATH: &str = "/gis_p_11";

/// Partition key for the unfiltered registry
pub const ALL_PARTITION: &str = "all";

/// Maximum records requested per call
const PAGE_LIMIT: u32 = 2000;

/// Field holding a restaurant's city
pub const CITY_FIELD: &str = "city";

/// Field holding a restaurant's name
pub const NAME_FIELD: &str = "name";

/// Field holding a restaurant's street address
pub const ADDRESS_FIELD: &str = "address";

/// Client for the restaurant registry, one partition per city
#[derive(Debug, Clone)]
pub struct RestaurantUpstream {
    http: HttpFetcher,
    api_key: String,
}

impl RestaurantUpstream {
    /// Creates a client against `base_url` authenticating with `api_key`
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, UpstreamError> {
        Ok(Self {
            http: HttpFetcher::new("restaurants", base_url, timeout)?,
            api_key: api_key.into(),
        })
    }

    /// Query parameters for the partition named by `key`
    fn query(&self, key: &str) -> Vec<(&'static str, String)> {
        let mut query = vec![
            ("api_key", self.api_key.clone()),
            ("limit", PAGE_LIMIT.to_string()),
            ("sort", "ImportDate desc".to_string()),
            ("format", "JSON".to_string()),
        ];
        if !key.is_empty() && key != ALL_PARTITION {
            query.push(("filters[city]", key.to_string()));
        }
        query
    }
}

/// Pulls the `records` array out of a registry response
///
/// A missing or non-array `records` member yields no records.
pub fn extract_records(raw: Value) -> Vec<Value> {
    match raw {
        Value::Object(mut body) => match body.remove("records") {
            Some(Value::Array(records)) => records,
            _ => Vec::new(),
        },
        _ => Vec::new(),
    }
}

#[async_trait]
impl Upstream for RestaurantUpstream {
    fn name(&self) -> &'static str {
        "restaurants"
    }

    async fn fetch(&self, key: &str) -> Result<Value, UpstreamError> {
        self.http.get_json(DATASET_PATH, &self.query(key)).await
    }

    fn shape(&self, _key: &str, raw: Value) -> Vec<Value> {
        extract_records(raw)
    }
}
