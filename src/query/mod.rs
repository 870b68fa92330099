//! Read, search and invalidate operations over a cache engine
//!
//! This is the layer an HTTP or CLI front end talks to. It carries no caching
//! logic: every read goes through `CacheEngine::get_or_update`, and the result
//! is decorated with the partition's cache state.

pub mod news;
pub mod restaurants;
mod search;

pub use news::NewsQueries;
pub use restaurants::RestaurantQueries;
pub use search::KeywordSearch;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use crate::cache::CacheEngine;
use crate::upstream::{Upstream, UpstreamError};

/// Errors surfaced to query callers
#[derive(Debug, Error)]
pub enum QueryError {
    /// The data could not be retrieved and no fallback applied
    #[error(transparent)]
    Upstream(#[from] UpstreamError),

    /// A keyword search was requested without a keyword
    #[error("a search keyword is required")]
    MissingKeyword,
}

/// Records read from one partition, with the partition's cache state
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryResult {
    /// Human-readable summary of the query
    pub message: String,
    /// Partition the records were read from
    pub partition: String,
    /// Keyword the records were filtered by, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub keyword: Option<String>,
    /// Number of records returned
    pub total: usize,
    /// Whether the partition is currently within its TTL
    pub cached: bool,
    /// When the partition was last written
    pub cache_timestamp: Option<DateTime<Utc>>,
    /// The records themselves
    pub records: Vec<Value>,
}

impl QueryResult {
    /// Replaces the summary message
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }
}

/// Outcome of a cache invalidation
#[derive(Debug, Clone, Serialize)]
pub struct ClearResult {
    /// Human-readable summary
    pub message: String,
    /// Partition that was cleared, or `None` for all partitions
    pub partition: Option<String>,
}

/// Generic query operations over one cache engine
#[derive(Debug)]
pub struct QuerySurface<U> {
    engine: CacheEngine<U>,
    search: KeywordSearch,
}

impl<U: Upstream> QuerySurface<U> {
    /// Wraps `engine`, matching keywords with `search`
    pub fn new(engine: CacheEngine<U>, search: KeywordSearch) -> Self {
        Self { engine, search }
    }

    /// The underlying engine
    pub fn engine(&self) -> &CacheEngine<U> {
        &self.engine
    }

    /// Every record in `partition`
    pub async fn read(&self, partition: &str) -> Result<QueryResult, QueryError> {
        self.read_filtered(partition, |_| true).await
    }

    /// Records in `partition` that satisfy `predicate`
    pub async fn read_filtered<F>(&self, partition: &str, predicate: F) -> Result<QueryResult, QueryError>
    where
        F: Fn(&Value) -> bool,
    {
        let records: Vec<Value> = self
            .engine
            .get_or_update(partition)
            .await?
            .into_iter()
            .filter(|record| predicate(record))
            .collect();

        Ok(QueryResult {
            message: String::new(),
            partition: partition.to_string(),
            keyword: None,
            total: records.len(),
            cached: self.engine.is_valid(partition),
            cache_timestamp: self.engine.written_at(partition),
            records,
        })
    }

    /// Records in `partition` matching `keyword`, or all of them when no
    /// keyword is given
    pub async fn search(&self, partition: &str, keyword: Option<&str>) -> Result<QueryResult, QueryError> {
        match keyword.filter(|k| !k.is_empty()) {
            Some(keyword) => {
                let mut result = self
                    .read_filtered(partition, |record| self.search.matches(record, keyword))
                    .await?;
                result.keyword = Some(keyword.to_string());
                Ok(result)
            }
            None => self.read(partition).await,
        }
    }

    /// Drops one partition, or all of them when `partition` is `None`
    pub async fn invalidate(&self, partition: Option<&str>) -> ClearResult {
        self.engine.invalidate(partition).await;
        ClearResult {
            message: String::new(),
            partition: partition.map(str::to_string),
        }
    }
}
