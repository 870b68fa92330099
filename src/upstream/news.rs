//! Health Promotion Administration news feed
//!
//! Partitions are calendar years. The upstream is asked for the whole year by
//! date range, and the response is filtered again locally because the feed
//! also returns items that were only modified inside the range.

use async_trait::async_trait;
use chrono::{DateTime, Datelike, NaiveDate};
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

use super::{HttpFetcher, Upstream, UpstreamError};

/// Default base URL of the news API
pub const DEFAULT_BASE_URL: &str = "https://www.hpa.gov.tw/wf";

/// Path of the news endpoint under the base URL
const NEWS_PATH: &str = "/newsapi.ashx";

/// Field holding the publish date of a news item
pub const PUBLISH_DATE_FIELD: &str = "發布日期";

/// Field holding the headline of a news item
pub const TITLE_FIELD: &str = "標題";

/// Field holding the body of a news item
pub const CONTENT_FIELD: &str = "內容";

/// Client for the news feed, one partition per year
#[derive(Debug, Clone)]
pub struct NewsUpstream {
    http: HttpFetcher,
}

impl NewsUpstream {
    /// Creates a client against `base_url`
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, UpstreamError> {
        Ok(Self {
            http: HttpFetcher::new("news", base_url, timeout)?,
        })
    }
}

/// Query parameters covering the whole calendar year named by `key`
///
/// Dates use the upstream's `YYYY/M/D` form.
pub fn year_range(key: &str) -> [(&'static str, String); 2] {
    [
        ("startdate", format!("{}/1/1", key)),
        ("enddate", format!("{}/12/31", key)),
    ]
}

/// Keeps the items of `raw` whose publish date falls inside `year`
///
/// Non-object items and items with a missing or unparseable publish date are
/// dropped. A raw payload that is not an array yields no items.
pub fn filter_by_year(raw: Value, year: i32) -> Vec<Value> {
    let Value::Array(items) = raw else {
        return Vec::new();
    };
    let received = items.len();

    let filtered: Vec<Value> = items
        .into_iter()
        .filter(|item| {
            item.get(PUBLISH_DATE_FIELD)
                .and_then(Value::as_str)
                .and_then(parse_publish_date)
                .is_some_and(|date| date.year() == year)
        })
        .collect();

    debug!(year, received, kept = filtered.len(), "Filtered news items by publish year");
    filtered
}

/// Parses a publish date such as `2025/3/7`, `2025-03-07 10:00:00` or an
/// RFC 3339 timestamp
pub fn parse_publish_date(value: &str) -> Option<NaiveDate> {
    let value = value.trim();
    if let Ok(datetime) = DateTime::parse_from_rfc3339(value) {
        return Some(datetime.date_naive());
    }

    let date_part = value.split(|c: char| c.is_whitespace() || c == 'T').next()?;
    NaiveDate::parse_from_str(date_part, "%Y/%m/%d")
        .or_else(|_| NaiveDate::parse_from_str(date_part, "%Y-%m-%d"))
        .ok()
}

#[async_trait]
impl Upstream for NewsUpstream {
    fn name(&self) -> &'static str {
        "news"
    }

    async fn fetch(&self, key: &str) -> Result<Value, UpstreamError> {
        self.http.get_json(NEWS_PATH, &year_range(key)).await
    }

    fn shape(&self, key: &str, raw: Value) -> Vec<Value> {
        match key.trim().parse::<i32>() {
            Ok(year) => filter_by_year(raw, year),
            Err(_) => Vec::new(),
        }
    }
}
