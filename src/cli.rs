//! Command-line interface parsing for govcache
//!
//! Every flag that configures the caches can also be set through a
//! `GOVCACHE_*` environment variable.

use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;

/// govcache - cached access to Taiwanese government open data
#[derive(Parser, Debug)]
#[command(name = "govcache")]
#[command(about = "Cached access to health news and vegetarian restaurant open data")]
#[command(version)]
pub struct Cli {
    /// Directory holding the cache snapshots [default: ./cache]
    #[arg(long, global = true, env = "GOVCACHE_CACHE_DIR", value_name = "DIR")]
    pub cache_dir: Option<PathBuf>,

    /// Store snapshots in the platform's per-user cache directory
    #[arg(long, global = true, conflicts_with = "cache_dir")]
    pub user_cache: bool,

    /// API key for the restaurant registry
    #[arg(long, global = true, env = "GOVCACHE_MOENV_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Override the news API base URL
    #[arg(long, global = true, env = "GOVCACHE_NEWS_URL", value_name = "URL")]
    pub news_url: Option<String>,

    /// Override the restaurant API base URL
    #[arg(long, global = true, env = "GOVCACHE_RESTAURANT_URL", value_name = "URL")]
    pub restaurant_url: Option<String>,

    /// Serve expired news when the news API is unavailable
    #[arg(long, global = true)]
    pub news_stale_fallback: bool,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// Which cache to operate on
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Health Promotion Administration news, partitioned by year
    News {
        #[command(subcommand)]
        action: NewsAction,
    },
    /// Vegetarian restaurant registry, partitioned by city
    Restaurants {
        #[command(subcommand)]
        action: RestaurantAction,
    },
}

/// News operations
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum NewsAction {
    /// All news published in a year (default: current year)
    List {
        #[arg(long)]
        year: Option<i32>,
    },
    /// The current year's news
    Latest,
    /// Current-year news, optionally filtered by keyword
    Search {
        #[arg(long)]
        keyword: Option<String>,
    },
    /// Current-year news matching a required keyword
    Keyword { keyword: String },
    /// Clear one year's cache, or all of it
    Clear {
        #[arg(long)]
        year: Option<String>,
    },
}

/// Restaurant operations
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum RestaurantAction {
    /// The whole registry
    List,
    /// Registry entries in one city
    City { city: String },
    /// Search by keyword, optionally within one city
    Search {
        #[arg(long)]
        city: Option<String>,
        #[arg(long)]
        keyword: Option<String>,
    },
    /// Clear one city's cache, or all of it
    Clear {
        #[arg(long)]
        city: Option<String>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parse_news_list_default_year() {
        let cli = Cli::parse_from(["govcache", "news", "list"]);
        assert_eq!(cli.command, Command::News { action: NewsAction::List { year: None } });
        assert_eq!(cli.verbose, 0);
    }

    #[test]
    fn test_cli_parse_news_list_with_year() {
        let cli = Cli::parse_from(["govcache", "news", "list", "--year", "2024"]);
        assert_eq!(
            cli.command,
            Command::News { action: NewsAction::List { year: Some(2024) } }
        );
    }

    #[test]
    fn test_cli_parse_news_keyword() {
        let cli = Cli::parse_from(["govcache", "news", "keyword", "流感"]);
        assert_eq!(
            cli.command,
            Command::News { action: NewsAction::Keyword { keyword: "流感".to_string() } }
        );
    }

    #[test]
    fn test_cli_parse_restaurant_search() {
        let cli = Cli::parse_from([
            "govcache",
            "restaurants",
            "search",
            "--city",
            "臺北市",
            "--keyword",
            "green",
        ]);
        assert_eq!(
            cli.command,
            Command::Restaurants {
                action: RestaurantAction::Search {
                    city: Some("臺北市".to_string()),
                    keyword: Some("green".to_string()),
                }
            }
        );
    }

    #[test]
    fn test_cli_parse_global_flags_after_subcommand() {
        let cli = Cli::parse_from(["govcache", "restaurants", "list", "-vv", "--cache-dir", "/tmp/c"]);
        assert_eq!(cli.verbose, 2);
        assert_eq!(cli.cache_dir, Some(PathBuf::from("/tmp/c")));
    }

    #[test]
    fn test_cli_user_cache_conflicts_with_cache_dir() {
        let result = Cli::try_parse_from(["govcache", "--user-cache", "--cache-dir", "/tmp/c", "news", "latest"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_cli_requires_subcommand() {
        assert!(Cli::try_parse_from(["govcache"]).is_err());
        assert!(Cli::try_parse_from(["govcache", "news"]).is_err());
    }

    #[test]
    fn test_cli_rejects_non_numeric_year() {
        assert!(Cli::try_parse_from(["govcache", "news", "list", "--year", "soon"]).is_err());
    }
}
