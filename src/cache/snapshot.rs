//! Durable snapshot store for a partition table
//!
//! A snapshot is the whole cache table serialized to a single JSON document:
//!
//! ```json
//! { "data": { "2025": [ ... ] }, "timestamp": { "2025": 1735689600000 } }
//! ```
//!
//! The store has no policy of its own. `load` and `save` never fail: a missing
//! or corrupt file loads as an empty snapshot, and a failed write is logged and
//! dropped so the in-memory table stays authoritative. A partition whose data
//! is not an array is dropped on load without discarding its neighbours.
//!
//! `SnapshotWriter` runs saves on the blocking pool, one at a time, so that
//! callers holding the in-memory table never wait on the filesystem.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, error, warn};

/// Errors that can occur when reading or writing a snapshot file
#[derive(Debug, Error)]
pub enum SnapshotError {
    /// The file exists but is not a valid snapshot document
    #[error("snapshot is corrupt: {0}")]
    Corrupt(#[from] serde_json::Error),

    /// Filesystem error while reading or writing
    #[error("snapshot I/O failed: {0}")]
    Io(#[from] io::Error),
}

/// On-disk shape of a cache table
///
/// Keys are kept sorted so that two saves of the same table produce identical
/// files.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Payload per partition key
    #[serde(default, deserialize_with = "array_members")]
    pub data: BTreeMap<String, Vec<Value>>,
    /// Last write time per partition key, in milliseconds since the Unix epoch
    #[serde(default, deserialize_with = "integer_members")]
    pub timestamp: BTreeMap<String, i64>,
}

/// Keeps the members of a JSON object whose values are arrays
fn array_members<'de, D>(deserializer: D) -> Result<BTreeMap<String, Vec<Value>>, D::Error>
where
    D: Deserializer<'de>,
{
    let members = Option::<BTreeMap<String, Value>>::deserialize(deserializer)?;
    Ok(members
        .unwrap_or_default()
        .into_iter()
        .filter_map(|(key, value)| match value {
            Value::Array(records) => Some((key, records)),
            other => {
                warn!(partition = %key, value = %other, "Dropping snapshot partition that is not an array");
                None
            }
        })
        .collect())
}

/// Keeps the members of a JSON object whose values are integers
fn integer_members<'de, D>(deserializer: D) -> Result<BTreeMap<String, i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let members = Option::<BTreeMap<String, Value>>::deserialize(deserializer)?;
    Ok(members
        .unwrap_or_default()
        .into_iter()
        .filter_map(|(key, value)| value.as_i64().map(|ms| (key, ms)))
        .collect())
}

impl Snapshot {
    /// Returns true if the snapshot holds no partitions
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// Reads and writes a single snapshot file
#[derive(Debug, Clone)]
pub struct SnapshotStore {
    path: PathBuf,
}

impl SnapshotStore {
    /// Creates a store backed by the file at `path`
    ///
    /// Nothing is touched on disk until the first `load` or `save`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path of the snapshot file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads the snapshot, treating a missing or unreadable file as empty
    pub fn load(&self) -> Snapshot {
        match self.try_load() {
            Ok(Some(snapshot)) => {
                debug!(
                    path = %self.path.display(),
                    partitions = snapshot.data.len(),
                    "Loaded cache snapshot"
                );
                snapshot
            }
            Ok(None) => Snapshot::default(),
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Ignoring unusable cache snapshot");
                Snapshot::default()
            }
        }
    }

    /// Loads the snapshot, reporting failures to the caller
    ///
    /// Returns `Ok(None)` when the file does not exist.
    pub fn try_load(&self) -> Result<Option<Snapshot>, SnapshotError> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let snapshot = serde_json::from_str(&content)?;
        Ok(Some(snapshot))
    }

    /// Overwrites the snapshot file, logging and swallowing any failure
    pub fn save(&self, snapshot: &Snapshot) {
        match self.try_save(snapshot) {
            Ok(()) => debug!(
                path = %self.path.display(),
                partitions = snapshot.data.len(),
                "Saved cache snapshot"
            ),
            Err(e) => error!(path = %self.path.display(), error = %e, "Failed to save cache snapshot"),
        }
    }

    /// Overwrites the snapshot file, reporting failures to the caller
    ///
    /// The document is written to a sibling temporary file and renamed into
    /// place, so readers see either the old or the new snapshot in full.
    pub fn try_save(&self, snapshot: &Snapshot) -> Result<(), SnapshotError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let json = serde_json::to_string_pretty(snapshot)?;
        let temp_path = self.path.with_extension("json.tmp");
        fs::write(&temp_path, json)?;
        fs::rename(&temp_path, &self.path)?;
        Ok(())
    }
}

/// Writes snapshots of one table in the background, newest revision wins
///
/// Writes are serialized by an async lock. A write whose revision is not
/// newer than the last one on disk is skipped, so a slow older dump can never
/// overwrite a newer one.
#[derive(Debug)]
pub struct SnapshotWriter {
    store: SnapshotStore,
    written: Mutex<Option<u64>>,
}

impl SnapshotWriter {
    /// Creates a writer that has not written anything yet
    pub fn new(store: SnapshotStore) -> Self {
        Self {
            store,
            written: Mutex::new(None),
        }
    }

    /// Saves `snapshot` unless a newer revision is already on disk
    ///
    /// Only the calling task waits for the disk; failures are logged and
    /// dropped like `SnapshotStore::save`.
    pub async fn write(&self, revision: u64, snapshot: Snapshot) {
        let mut written = self.written.lock().await;
        if matches!(*written, Some(last) if revision <= last) {
            debug!(path = %self.store.path().display(), revision, "Skipping superseded snapshot");
            return;
        }

        let store = self.store.clone();
        if let Err(e) = tokio::task::spawn_blocking(move || store.save(&snapshot)).await {
            error!(path = %self.store.path().display(), error = %e, "Snapshot save task failed");
            return;
        }
        *written = Some(revision);
    }
}
