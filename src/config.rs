//! Runtime configuration
//!
//! Defaults describe the production setup: snapshots under `cache/` in the
//! working directory, the public upstream URLs, a 48h TTL for news and a 24h
//! TTL with stale fallback for restaurants. `Config::from_cli` layers command
//! line flags and environment variables on top.

use chrono::Duration;
use directories::ProjectDirs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::cache::CachePolicy;
use crate::cli::Cli;
use crate::upstream::{news, restaurants, REQUEST_TIMEOUT};

/// Snapshot file name for the news cache
pub const NEWS_SNAPSHOT_FILE: &str = "hpa-news-cache.json";

/// Snapshot file name for the restaurant cache
pub const RESTAURANT_SNAPSHOT_FILE: &str = "restaurant-cache.json";

/// Default snapshot directory, relative to the working directory
pub const DEFAULT_CACHE_DIR: &str = "cache";

/// Errors that can occur while building configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// `--user-cache` was requested but the platform has no cache directory
    #[error("could not determine a user cache directory (no home directory?)")]
    NoUserCacheDir,
}

/// Settings for one cached upstream
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceConfig {
    /// Base URL of the upstream API
    pub base_url: String,
    /// Snapshot file for this cache instance
    pub snapshot_path: PathBuf,
    /// Partition time-to-live
    pub ttl: Duration,
    /// Serve expired data when the upstream fails
    pub fallback_on_error: bool,
}

impl SourceConfig {
    /// Cache policy for this source
    pub fn policy(&self) -> CachePolicy {
        CachePolicy {
            ttl: self.ttl,
            fallback_on_error: self.fallback_on_error,
        }
    }
}

/// Complete configuration for both cache instances
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Directory holding both snapshot files
    pub cache_dir: PathBuf,
    /// News feed settings
    pub news: SourceConfig,
    /// Restaurant registry settings
    pub restaurants: SourceConfig,
    /// API key sent to the restaurant registry
    pub restaurant_api_key: String,
    /// Timeout applied to each upstream request
    pub request_timeout: std::time::Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self::with_cache_dir(DEFAULT_CACHE_DIR)
    }
}

impl Config {
    /// Default configuration with snapshots stored under `cache_dir`
    pub fn with_cache_dir(cache_dir: impl Into<PathBuf>) -> Self {
        let cache_dir = cache_dir.into();
        Self {
            news: SourceConfig {
                base_url: news::DEFAULT_BASE_URL.to_string(),
                snapshot_path: cache_dir.join(NEWS_SNAPSHOT_FILE),
                ttl: Duration::hours(48),
                fallback_on_error: false,
            },
            restaurants: SourceConfig {
                base_url: restaurants::DEFAULT_BASE_URL.to_string(),
                snapshot_path: cache_dir.join(RESTAURANT_SNAPSHOT_FILE),
                ttl: Duration::hours(24),
                fallback_on_error: true,
            },
            cache_dir,
            restaurant_api_key: String::new(),
            request_timeout: REQUEST_TIMEOUT,
        }
    }

    /// Builds configuration from parsed command line arguments
    ///
    /// Environment variables are already folded into `cli` by clap.
    pub fn from_cli(cli: &Cli) -> Result<Self, ConfigError> {
        let cache_dir = match (&cli.cache_dir, cli.user_cache) {
            (Some(dir), _) => dir.clone(),
            (None, true) => user_cache_dir().ok_or(ConfigError::NoUserCacheDir)?,
            (None, false) => PathBuf::from(DEFAULT_CACHE_DIR),
        };

        let mut config = Self::with_cache_dir(cache_dir);
        if let Some(url) = &cli.news_url {
            config.news.base_url = url.clone();
        }
        if let Some(url) = &cli.restaurant_url {
            config.restaurants.base_url = url.clone();
        }
        if cli.news_stale_fallback {
            config.news.fallback_on_error = true;
        }
        config.restaurant_api_key = cli.api_key.clone().unwrap_or_default();
        Ok(config)
    }

    /// Directory holding both snapshot files
    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }
}

/// Platform cache directory for this tool (`~/.cache/govcache` on Linux)
pub fn user_cache_dir() -> Option<PathBuf> {
    let project_dirs = ProjectDirs::from("", "", "govcache")?;
    Some(project_dirs.cache_dir().to_path_buf())
}
