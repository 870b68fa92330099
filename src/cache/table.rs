//! In-memory partition table with TTL validity
//!
//! The table never touches disk itself. Every mutation bumps a revision
//! counter, and `checkpoint` hands out the full table in snapshot form together
//! with that revision so the owner can write it out after releasing its lock.

use chrono::{DateTime, Duration, SubsecRound, Utc};
use serde_json::Value;
use std::collections::HashMap;
use tracing::info;

use super::snapshot::{Snapshot, SnapshotStore};

/// A single independently-expirable slice of the cache
#[derive(Debug, Clone, PartialEq)]
struct Partition {
    payload: Vec<Value>,
    /// Millisecond precision, matching the snapshot format
    written_at: DateTime<Utc>,
}

/// Mapping from partition key to partition, with one TTL for the whole table
#[derive(Debug)]
pub struct PartitionTable {
    partitions: HashMap<String, Partition>,
    ttl: Duration,
    revision: u64,
}

impl PartitionTable {
    /// Creates an empty table
    pub fn new(ttl: Duration) -> Self {
        Self {
            partitions: HashMap::new(),
            ttl,
            revision: 0,
        }
    }

    /// Creates a table populated from the snapshot file
    ///
    /// A missing or corrupt snapshot yields an empty table.
    pub fn open(store: &SnapshotStore, ttl: Duration) -> Self {
        Self::from_snapshot(store.load(), ttl)
    }

    /// Creates a table from an already-loaded snapshot
    ///
    /// Keys without a timestamp are kept readable but never valid; timestamps
    /// without data are dropped.
    pub fn from_snapshot(snapshot: Snapshot, ttl: Duration) -> Self {
        let Snapshot { data, timestamp } = snapshot;
        let partitions = data
            .into_iter()
            .map(|(key, payload)| {
                let written_at = timestamp
                    .get(&key)
                    .and_then(|ms| DateTime::<Utc>::from_timestamp_millis(*ms))
                    .unwrap_or_default();
                (key, Partition { payload, written_at })
            })
            .collect();
        Self {
            partitions,
            ttl,
            revision: 0,
        }
    }

    /// Time-to-live applied to every partition
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Number of partitions currently stored
    pub fn len(&self) -> usize {
        self.partitions.len()
    }

    /// Returns true if no partitions are stored
    pub fn is_empty(&self) -> bool {
        self.partitions.is_empty()
    }

    /// Number of mutations applied since the table was built
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Returns true if the partition exists and is younger than the TTL
    pub fn is_valid(&self, key: &str) -> bool {
        self.is_valid_at(key, Utc::now())
    }

    /// Validity check against an explicit clock reading
    pub fn is_valid_at(&self, key: &str, now: DateTime<Utc>) -> bool {
        self.partitions
            .get(key)
            .is_some_and(|partition| now - partition.written_at < self.ttl)
    }

    /// Returns the stored payload whether or not it is still valid
    pub fn get(&self, key: &str) -> Option<&[Value]> {
        self.partitions.get(key).map(|p| p.payload.as_slice())
    }

    /// Returns when the partition was last written
    pub fn written_at(&self, key: &str) -> Option<DateTime<Utc>> {
        self.partitions.get(key).map(|p| p.written_at)
    }

    /// Stores a payload stamped with the current time
    pub fn set(&mut self, key: &str, payload: Vec<Value>) {
        self.set_at(key, payload, Utc::now());
    }

    /// Stores a payload stamped with `now`
    pub fn set_at(&mut self, key: &str, payload: Vec<Value>, now: DateTime<Utc>) {
        let written_at = now.trunc_subsecs(3);
        let records = payload.len();
        self.partitions
            .insert(key.to_string(), Partition { payload, written_at });
        self.revision += 1;
        info!(partition = %key, records, %written_at, "Cache partition updated");
    }

    /// Removes one partition, or every partition when `key` is `None`
    pub fn invalidate(&mut self, key: Option<&str>) {
        match key {
            Some(key) => {
                self.partitions.remove(key);
                info!(partition = %key, "Cache partition cleared");
            }
            None => {
                self.partitions.clear();
                info!("All cache partitions cleared");
            }
        }
        self.revision += 1;
    }

    /// Full-table view in snapshot form
    pub fn snapshot(&self) -> Snapshot {
        let mut snapshot = Snapshot::default();
        for (key, partition) in &self.partitions {
            snapshot
                .data
                .insert(key.clone(), partition.payload.clone());
            snapshot
                .timestamp
                .insert(key.clone(), partition.written_at.timestamp_millis());
        }
        snapshot
    }

    /// Current revision paired with the snapshot it describes
    pub fn checkpoint(&self) -> (u64, Snapshot) {
        (self.revision, self.snapshot())
    }
}
