//! Command dispatch for the govcache binary
//!
//! Builds only the cache instance a command needs, runs the query, flushes the
//! snapshot and renders the result as pretty JSON.

use serde::Serialize;
use thiserror::Error;
use tracing::debug;

use crate::cli::{Cli, Command, NewsAction, RestaurantAction};
use crate::config::{Config, ConfigError};
use crate::query::{NewsQueries, QueryError, RestaurantQueries};

/// Errors that end a command run
#[derive(Debug, Error)]
pub enum AppError {
    /// Configuration could not be resolved
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The query failed
    #[error(transparent)]
    Query(#[from] QueryError),

    /// The result could not be rendered
    #[error("failed to render output: {0}")]
    Output(#[from] serde_json::Error),
}

/// Runs the command described by `cli` and returns its JSON output
pub async fn run(cli: &Cli) -> Result<String, AppError> {
    let config = Config::from_cli(cli)?;
    debug!(cache_dir = %config.cache_dir().display(), "Resolved configuration");

    match &cli.command {
        Command::News { action } => {
            let queries = NewsQueries::from_config(&config)?;
            let output = run_news(&queries, action).await;
            queries.surface().engine().flush().await;
            output
        }
        Command::Restaurants { action } => {
            let queries = RestaurantQueries::from_config(&config)?;
            let output = run_restaurants(&queries, action).await;
            queries.surface().engine().flush().await;
            output
        }
    }
}

async fn run_news(queries: &NewsQueries, action: &NewsAction) -> Result<String, AppError> {
    match action {
        NewsAction::List { year } => render(&queries.list(*year).await?),
        NewsAction::Latest => render(&queries.latest().await?),
        NewsAction::Search { keyword } => render(&queries.search(keyword.as_deref()).await?),
        NewsAction::Keyword { keyword } => render(&queries.search_by_keyword(keyword).await?),
        NewsAction::Clear { year } => render(&queries.clear(year.as_deref()).await),
    }
}

async fn run_restaurants(queries: &RestaurantQueries, action: &RestaurantAction) -> Result<String, AppError> {
    match action {
        RestaurantAction::List => render(&queries.list().await?),
        RestaurantAction::City { city } => render(&queries.by_city(city).await?),
        RestaurantAction::Search { city, keyword } => {
            render(&queries.search(city.as_deref(), keyword.as_deref()).await?)
        }
        RestaurantAction::Clear { city } => render(&queries.clear(city.as_deref()).await),
    }
}

fn render<T: Serialize>(value: &T) -> Result<String, AppError> {
    Ok(serde_json::to_string_pretty(value)?)
}
