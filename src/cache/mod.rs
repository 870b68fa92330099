//! Partitioned TTL cache with durable snapshots
//!
//! Records fetched from an upstream are kept in independently-expirable
//! partitions. The whole table is mirrored to a JSON snapshot after every
//! change so a restarted process picks up where it left off. Snapshot writes
//! happen outside the table lock. Expired partitions are kept around: engines
//! configured for it serve them when the upstream is unavailable.

mod engine;
mod snapshot;
mod table;

pub use engine::{CacheEngine, CachePolicy};
pub use snapshot::{Snapshot, SnapshotError, SnapshotStore};
pub use table::PartitionTable;
