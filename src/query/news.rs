//! Queries over the news cache
//!
//! Partitions are years; the default partition is the current local year.
//! Keyword search is case-sensitive over title and content.

use chrono::{Datelike, Local};

use super::{ClearResult, KeywordSearch, QueryError, QueryResult, QuerySurface};
use crate::cache::{CacheEngine, SnapshotStore};
use crate::config::Config;
use crate::upstream::news::{CONTENT_FIELD, TITLE_FIELD};
use crate::upstream::NewsUpstream;

/// News read/search/clear operations
#[derive(Debug)]
pub struct NewsQueries {
    surface: QuerySurface<NewsUpstream>,
}

impl NewsQueries {
    /// Wraps an engine fronting the news upstream
    pub fn new(engine: CacheEngine<NewsUpstream>) -> Self {
        Self {
            surface: QuerySurface::new(engine, KeywordSearch::new(&[TITLE_FIELD, CONTENT_FIELD])),
        }
    }

    /// Builds the upstream client and cache from configuration
    pub fn from_config(config: &Config) -> Result<Self, QueryError> {
        let source = &config.news;
        let upstream = NewsUpstream::new(source.base_url.clone(), config.request_timeout)?;
        let store = SnapshotStore::new(source.snapshot_path.clone());
        Ok(Self::new(CacheEngine::new(upstream, store, source.policy())))
    }

    /// The underlying query surface
    pub fn surface(&self) -> &QuerySurface<NewsUpstream> {
        &self.surface
    }

    /// Partition key for the current local year
    pub fn current_partition() -> String {
        Local::now().year().to_string()
    }

    /// All news published in `year`, defaulting to the current year
    pub async fn list(&self, year: Option<i32>) -> Result<QueryResult, QueryError> {
        let partition = year.map_or_else(Self::current_partition, |y| y.to_string());
        let result = self.surface.read(&partition).await?;
        Ok(result.with_message(format!("{} news (filtered)", partition)))
    }

    /// The current year's news
    pub async fn latest(&self) -> Result<QueryResult, QueryError> {
        let partition = Self::current_partition();
        let result = self.surface.read(&partition).await?;
        Ok(result.with_message(format!("{} latest news (filtered)", partition)))
    }

    /// Current-year news matching `keyword`, or all of it without a keyword
    pub async fn search(&self, keyword: Option<&str>) -> Result<QueryResult, QueryError> {
        let partition = Self::current_partition();
        let result = self.surface.search(&partition, keyword).await?;
        Ok(result.with_message(format!("{} news search (filtered)", partition)))
    }

    /// Current-year news matching `keyword`, which must not be empty
    pub async fn search_by_keyword(&self, keyword: &str) -> Result<QueryResult, QueryError> {
        let keyword = keyword.trim();
        if keyword.is_empty() {
            return Err(QueryError::MissingKeyword);
        }
        let partition = Self::current_partition();
        let result = self.surface.search(&partition, Some(keyword)).await?;
        Ok(result.with_message(format!("{} news matching keyword (filtered)", partition)))
    }

    /// Clears one year's partition, or every partition
    pub async fn clear(&self, year: Option<&str>) -> ClearResult {
        let mut result = self.surface.invalidate(year).await;
        result.message = match year {
            Some(year) => format!("{} news cache cleared", year),
            None => "All news cache cleared".to_string(),
        };
        result
    }
}
