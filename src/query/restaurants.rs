//! Queries over the restaurant cache
//!
//! The full registry lives in the `all` partition; city-filtered fetches get
//! their own partitions. Keyword search is case-insensitive over name and
//! address.

use serde_json::Value;

use super::{ClearResult, KeywordSearch, QueryError, QueryResult, QuerySurface};
use crate::cache::{CacheEngine, SnapshotStore};
use crate::config::Config;
use crate::upstream::restaurants::{ADDRESS_FIELD, ALL_PARTITION, CITY_FIELD, NAME_FIELD};
use crate::upstream::RestaurantUpstream;

/// Restaurant read/search/clear operations
#[derive(Debug)]
pub struct RestaurantQueries {
    surface: QuerySurface<RestaurantUpstream>,
}

impl RestaurantQueries {
    /// Wraps an engine fronting the restaurant upstream
    pub fn new(engine: CacheEngine<RestaurantUpstream>) -> Self {
        let search = KeywordSearch::new(&[NAME_FIELD, ADDRESS_FIELD]).case_insensitive();
        Self {
            surface: QuerySurface::new(engine, search),
        }
    }

    /// Builds the upstream client and cache from configuration
    pub fn from_config(config: &Config) -> Result<Self, QueryError> {
        let source = &config.restaurants;
        let upstream = RestaurantUpstream::new(
            source.base_url.clone(),
            config.restaurant_api_key.clone(),
            config.request_timeout,
        )?;
        let store = SnapshotStore::new(source.snapshot_path.clone());
        Ok(Self::new(CacheEngine::new(upstream, store, source.policy())))
    }

    /// The underlying query surface
    pub fn surface(&self) -> &QuerySurface<RestaurantUpstream> {
        &self.surface
    }

    /// The whole registry
    pub async fn list(&self) -> Result<QueryResult, QueryError> {
        let result = self.surface.read(ALL_PARTITION).await?;
        Ok(result.with_message("Restaurant data (cached)"))
    }

    /// Registry entries whose city is exactly `city`
    ///
    /// Filters the `all` partition rather than fetching a city partition.
    pub async fn by_city(&self, city: &str) -> Result<QueryResult, QueryError> {
        let result = self
            .surface
            .read_filtered(ALL_PARTITION, |record| {
                record.get(CITY_FIELD).and_then(Value::as_str) == Some(city)
            })
            .await?;
        Ok(result.with_message(format!("{} restaurant data (cached)", city)))
    }

    /// Restaurants in `city` (or anywhere) matching `keyword` (or all)
    pub async fn search(&self, city: Option<&str>, keyword: Option<&str>) -> Result<QueryResult, QueryError> {
        let partition = city.filter(|c| !c.is_empty()).unwrap_or(ALL_PARTITION);
        let result = self.surface.search(partition, keyword).await?;
        Ok(result.with_message("Restaurant search results"))
    }

    /// Clears one city's partition, or every partition
    pub async fn clear(&self, city: Option<&str>) -> ClearResult {
        let mut result = self.surface.invalidate(city).await;
        result.message = match city {
            Some(city) => format!("{} restaurant cache cleared", city),
            None => "All restaurant cache cleared".to_string(),
        };
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{CachePolicy, Snapshot};
    use chrono::{Duration, Utc};
    use serde_json::json;
    use std::time::Duration as StdDuration;
    use tempfile::TempDir;

    /// Restaurant queries over a seeded snapshot and an unreachable upstream
    fn create_queries(partitions: &[(&str, Vec<Value>, Duration)]) -> (RestaurantQueries, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let store = SnapshotStore::new(temp_dir.path().join("restaurants.json"));
        let mut snapshot = Snapshot::default();
        for (key, records, age) in partitions {
            snapshot.data.insert(key.to_string(), records.clone());
            snapshot
                .timestamp
                .insert(key.to_string(), (Utc::now() - *age).timestamp_millis());
        }
        store.save(&snapshot);

        let upstream = RestaurantUpstream::new("http://127.0.0.1:1", "k", StdDuration::from_secs(2)).unwrap();
        let policy = CachePolicy {
            ttl: Duration::hours(24),
            fallback_on_error: true,
        };
        (RestaurantQueries::new(CacheEngine::new(upstream, store, policy)), temp_dir)
    }

    fn registry() -> Vec<Value> {
        vec![
            json!({"name": "Green Bowl", "address": "1 Zhongshan Rd", "city": "臺北市"}),
            json!({"name": "Lotus Kitchen", "address": "9 Minzu Rd", "city": "臺南市"}),
            json!({"name": "Bodhi Garden", "address": "5 Green St", "city": "臺北市"}),
        ]
    }

    #[tokio::test]
    async fn test_by_city_filters_all_partition() {
        let (queries, _temp_dir) = create_queries(&[(ALL_PARTITION, registry(), Duration::hours(1))]);

        let result = queries.by_city("臺北市").await.unwrap();

        assert_eq!(result.partition, ALL_PARTITION);
        assert_eq!(result.total, 2);
        assert!(result.cached);
    }

    #[tokio::test]
    async fn test_search_is_case_insensitive_over_name_and_address() {
        let (queries, _temp_dir) = create_queries(&[(ALL_PARTITION, registry(), Duration::hours(1))]);

        let result = queries.search(None, Some("GREEN")).await.unwrap();

        assert_eq!(result.total, 2);
        assert_eq!(result.keyword.as_deref(), Some("GREEN"));
    }

    #[tokio::test]
    async fn test_search_with_city_uses_city_partition() {
        let tainan = vec![json!({"name": "Lotus Kitchen", "address": "9 Minzu Rd", "city": "臺南市"})];
        let (queries, _temp_dir) = create_queries(&[
            (ALL_PARTITION, registry(), Duration::hours(1)),
            ("臺南市", tainan, Duration::hours(1)),
        ]);

        let result = queries.search(Some("臺南市"), None).await.unwrap();

        assert_eq!(result.partition, "臺南市");
        assert_eq!(result.total, 1);
    }

    #[tokio::test]
    async fn test_expired_registry_served_when_upstream_down() {
        let (queries, _temp_dir) = create_queries(&[(ALL_PARTITION, registry(), Duration::hours(30))]);

        let result = queries.list().await.unwrap();

        assert_eq!(result.total, 3);
        assert!(!result.cached);
    }

    #[tokio::test]
    async fn test_missing_registry_with_upstream_down_fails() {
        let (queries, _temp_dir) = create_queries(&[]);

        let err = queries.list().await.unwrap_err();

        assert!(err.to_string().contains("could not retrieve data from restaurants"));
    }

    #[tokio::test]
    async fn test_clear_city() {
        let (queries, _temp_dir) = create_queries(&[
            (ALL_PARTITION, registry(), Duration::hours(1)),
            ("臺南市", Vec::new(), Duration::hours(1)),
        ]);

        let cleared = queries.clear(Some("臺南市")).await;

        assert_eq!(cleared.message, "臺南市 restaurant cache cleared");
        assert!(queries.surface().engine().peek("臺南市").is_none());
        assert!(queries.surface().engine().is_valid(ALL_PARTITION));
    }
}
