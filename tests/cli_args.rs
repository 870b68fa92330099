//! Integration tests for the govcache binary
//!
//! Every run points both upstreams at a closed local port and keeps snapshots
//! in a temporary directory, so no test touches the network or the real cache.

use std::fs;
use std::path::Path;
use std::process::Command;

use chrono::{Duration, Utc};
use serde_json::{json, Value};
use tempfile::TempDir;

const UNREACHABLE: &str = "http://127.0.0.1:1";

/// Helper to run the CLI with given args and capture output
fn run_cli(cache_dir: &Path, args: &[&str]) -> std::process::Output {
    Command::new(env!("CARGO_BIN_EXE_govcache"))
        .arg("--cache-dir")
        .arg(cache_dir)
        .args(["--news-url", UNREACHABLE, "--restaurant-url", UNREACHABLE])
        .args(args)
        .env_remove("RUST_LOG")
        .output()
        .expect("Failed to execute govcache")
}

fn write_snapshot(path: &Path, key: &str, records: Value, age: Duration) {
    let snapshot = json!({
        "data": { key: records },
        "timestamp": { key: (Utc::now() - age).timestamp_millis() },
    });
    fs::write(path, serde_json::to_string_pretty(&snapshot).unwrap()).unwrap();
}

#[test]
fn test_help_flag_exits_successfully() {
    let output = Command::new(env!("CARGO_BIN_EXE_govcache"))
        .arg("--help")
        .output()
        .expect("Failed to execute govcache");

    assert!(output.status.success(), "Expected --help to exit successfully");
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("govcache"));
    assert!(stdout.contains("news"));
    assert!(stdout.contains("restaurants"));
}

#[test]
fn test_unreachable_upstream_without_cache_fails() {
    let temp_dir = TempDir::new().unwrap();

    let output = run_cli(temp_dir.path(), &["restaurants", "list"]);

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        stderr.contains("could not retrieve data"),
        "Should report the upstream failure: {}",
        stderr
    );
    assert!(output.stdout.is_empty());
}

#[test]
fn test_expired_restaurants_served_when_upstream_down() {
    let temp_dir = TempDir::new().unwrap();
    let snapshot_path = temp_dir.path().join("restaurant-cache.json");
    write_snapshot(
        &snapshot_path,
        "all",
        json!([{"name": "Green Bowl", "city": "臺北市"}]),
        Duration::hours(30),
    );
    let before = fs::read_to_string(&snapshot_path).unwrap();

    let output = run_cli(temp_dir.path(), &["restaurants", "list"]);

    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    let body: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(body["total"], 1);
    assert_eq!(body["cached"], false);
    let after: Value = serde_json::from_str(&fs::read_to_string(&snapshot_path).unwrap()).unwrap();
    let before: Value = serde_json::from_str(&before).unwrap();
    assert_eq!(after["timestamp"], before["timestamp"], "Fallback must not refresh the timestamp");
}

#[test]
fn test_expired_news_is_not_served_when_upstream_down() {
    let temp_dir = TempDir::new().unwrap();
    let year = Utc::now().format("%Y").to_string();
    write_snapshot(
        &temp_dir.path().join("hpa-news-cache.json"),
        &year,
        json!([{"標題": "old news"}]),
        Duration::hours(49),
    );

    let output = run_cli(temp_dir.path(), &["news", "list", "--year", &year]);

    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("could not retrieve data from news"));
}

#[test]
fn test_news_stale_fallback_flag_enables_fallback() {
    let temp_dir = TempDir::new().unwrap();
    write_snapshot(
        &temp_dir.path().join("hpa-news-cache.json"),
        "2024",
        json!([{"標題": "old news"}]),
        Duration::hours(49),
    );

    let output = run_cli(
        temp_dir.path(),
        &["--news-stale-fallback", "news", "list", "--year", "2024"],
    );

    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    let body: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(body["records"][0]["標題"], "old news");
}

#[test]
fn test_clear_restaurants_writes_empty_snapshot() {
    let temp_dir = TempDir::new().unwrap();
    let snapshot_path = temp_dir.path().join("restaurant-cache.json");
    write_snapshot(&snapshot_path, "臺北市", json!([{"name": "r1"}]), Duration::hours(1));

    let output = run_cli(temp_dir.path(), &["restaurants", "clear"]);

    assert!(output.status.success());
    let snapshot: Value = serde_json::from_str(&fs::read_to_string(&snapshot_path).unwrap()).unwrap();
    assert_eq!(snapshot, json!({"data": {}, "timestamp": {}}));
}

#[test]
fn test_corrupt_snapshot_does_not_break_clear() {
    let temp_dir = TempDir::new().unwrap();
    let snapshot_path = temp_dir.path().join("hpa-news-cache.json");
    fs::write(&snapshot_path, "{ truncated").unwrap();

    let output = run_cli(temp_dir.path(), &["news", "clear", "--year", "2025"]);

    assert!(output.status.success());
    let body: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(body["partition"], "2025");
    let snapshot: Value = serde_json::from_str(&fs::read_to_string(&snapshot_path).unwrap()).unwrap();
    assert_eq!(snapshot, json!({"data": {}, "timestamp": {}}));
}

#[cfg(test)]
mod unit_tests {
    //! Parsing and configuration checks that don't require running the binary

    use clap::Parser;
    use govcache::cli::{Cli, Command, RestaurantAction};
    use govcache::config::Config;

    #[test]
    fn test_cli_restaurants_city() {
        let cli = Cli::parse_from(["govcache", "restaurants", "city", "臺北市"]);
        assert_eq!(
            cli.command,
            Command::Restaurants {
                action: RestaurantAction::City { city: "臺北市".to_string() }
            }
        );
    }

    #[test]
    fn test_config_from_cli_defaults_to_relative_cache_dir() {
        let cli = Cli::parse_from(["govcache", "--cache-dir", "cache", "news", "latest"]);
        let config = Config::from_cli(&cli).unwrap();
        assert_eq!(config.cache_dir().to_string_lossy(), "cache");
        assert!(!config.news.fallback_on_error);
        assert!(config.restaurants.fallback_on_error);
    }
}
