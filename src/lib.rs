//! govcache library
//!
//! A partitioned TTL cache with durable JSON snapshots and stale-on-error
//! fallback, fronting the HPA news feed and the MOENV vegetarian restaurant
//! registry. The binary is a thin CLI over `app::run`.

pub mod app;
pub mod cache;
pub mod cli;
pub mod config;
pub mod logging;
pub mod query;
pub mod upstream;
