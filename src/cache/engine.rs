//! Get-or-update orchestration over a partition table and an upstream
//!
//! `CacheEngine::get_or_update` serves a valid partition straight from memory.
//! Otherwise it fetches from the upstream, shapes the response, stores and
//! persists it. When the fetch fails, engines configured with
//! `fallback_on_error` serve the expired partition instead of the error.
//!
//! Concurrent misses on the same key share a single in-flight refresh, so the
//! upstream sees one request no matter how many callers are waiting.
//!
//! The table lock is only held for in-memory work. Each mutation takes a
//! checkpoint under the lock and the snapshot is written after it is released,
//! so readers of other keys never wait on the disk.

use chrono::{DateTime, Duration, Utc};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::OnceCell;
use tracing::{debug, info, warn};

use super::snapshot::{Snapshot, SnapshotStore, SnapshotWriter};
use super::table::PartitionTable;
use crate::upstream::{Upstream, UpstreamError};

/// Result of one refresh attempt, shared by every caller that waited on it
type Outcome = Result<Vec<Value>, UpstreamError>;

/// In-flight refresh for one partition key
type Flight = Arc<OnceCell<Outcome>>;

/// Per-instance cache behaviour
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CachePolicy {
    /// How long a written partition stays valid
    pub ttl: Duration,
    /// Serve expired data when the upstream fails
    pub fallback_on_error: bool,
}

/// Partitioned TTL cache in front of one upstream
#[derive(Debug)]
pub struct CacheEngine<U> {
    upstream: U,
    fallback_on_error: bool,
    table: Mutex<PartitionTable>,
    writer: SnapshotWriter,
    flights: Mutex<HashMap<String, Flight>>,
}

impl<U: Upstream> CacheEngine<U> {
    /// Creates an engine whose table is loaded from `store`
    pub fn new(upstream: U, store: SnapshotStore, policy: CachePolicy) -> Self {
        let table = PartitionTable::open(&store, policy.ttl);
        Self {
            upstream,
            fallback_on_error: policy.fallback_on_error,
            table: Mutex::new(table),
            writer: SnapshotWriter::new(store),
            flights: Mutex::new(HashMap::new()),
        }
    }

    /// The upstream this engine fronts
    pub fn upstream(&self) -> &U {
        &self.upstream
    }

    /// Current policy
    pub fn policy(&self) -> CachePolicy {
        CachePolicy {
            ttl: self.table().ttl(),
            fallback_on_error: self.fallback_on_error,
        }
    }

    /// Returns the records for `key`, refreshing from the upstream when the
    /// partition is missing or expired
    ///
    /// # Errors
    /// Returns the upstream error when the refresh fails and no fallback
    /// applies. The stored partition is left untouched in that case.
    pub async fn get_or_update(&self, key: &str) -> Result<Vec<Value>, UpstreamError> {
        if let Some(records) = self.fresh(key) {
            debug!(upstream = self.upstream.name(), partition = %key, "Serving cached partition");
            return Ok(records);
        }

        let flight = self.join_flight(key);
        let outcome = flight.get_or_init(|| self.refresh(key)).await.clone();
        self.land_flight(key, &flight);
        outcome
    }

    /// Stored records for `key`, valid or not, without touching the upstream
    pub fn peek(&self, key: &str) -> Option<Vec<Value>> {
        self.table().get(key).map(<[Value]>::to_vec)
    }

    /// Returns true if `key` is present and younger than the TTL
    pub fn is_valid(&self, key: &str) -> bool {
        self.table().is_valid(key)
    }

    /// When `key` was last written
    pub fn written_at(&self, key: &str) -> Option<DateTime<Utc>> {
        self.table().written_at(key)
    }

    /// Drops one partition, or all of them when `key` is `None`, and persists
    /// the table
    pub async fn invalidate(&self, key: Option<&str>) {
        let checkpoint = {
            let mut table = self.table();
            table.invalidate(key);
            table.checkpoint()
        };
        self.persist(checkpoint).await;
    }

    /// Persists the current table unless it is already on disk (best effort)
    pub async fn flush(&self) {
        let checkpoint = self.table().checkpoint();
        self.persist(checkpoint).await;
    }

    async fn persist(&self, (revision, snapshot): (u64, Snapshot)) {
        self.writer.write(revision, snapshot).await;
    }

    fn table(&self) -> MutexGuard<'_, PartitionTable> {
        self.table.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn fresh(&self, key: &str) -> Option<Vec<Value>> {
        let table = self.table();
        if table.is_valid(key) {
            table.get(key).map(<[Value]>::to_vec)
        } else {
            None
        }
    }

    /// One fetch-shape-store cycle with the fallback policy applied
    async fn refresh(&self, key: &str) -> Outcome {
        // Another flight may have completed between our miss and our join
        if let Some(records) = self.fresh(key) {
            return Ok(records);
        }

        let upstream = self.upstream.name();
        info!(upstream, partition = %key, "Cache stale or missing, fetching from upstream");

        match self.upstream.fetch(key).await {
            Ok(raw) => {
                let records = self.upstream.shape(key, raw);
                let checkpoint = {
                    let mut table = self.table();
                    table.set(key, records.clone());
                    table.checkpoint()
                };
                self.persist(checkpoint).await;
                Ok(records)
            }
            Err(e) => {
                warn!(upstream, partition = %key, error = %e, "Upstream fetch failed");
                if self.fallback_on_error {
                    let stale = self
                        .peek(key)
                        .filter(|records| !records.is_empty());
                    if let Some(records) = stale {
                        warn!(
                            upstream,
                            partition = %key,
                            records = records.len(),
                            "Serving expired partition after upstream failure"
                        );
                        return Ok(records);
                    }
                }
                Err(e)
            }
        }
    }

    fn join_flight(&self, key: &str) -> Flight {
        let mut flights = self.flights.lock().unwrap_or_else(PoisonError::into_inner);
        flights.entry(key.to_string()).or_default().clone()
    }

    fn land_flight(&self, key: &str, flight: &Flight) {
        let mut flights = self.flights.lock().unwrap_or_else(PoisonError::into_inner);
        if flights.get(key).is_some_and(|current| Arc::ptr_eq(current, flight)) {
            flights.remove(key);
        }
    }
}
