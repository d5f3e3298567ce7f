//! Durable state for `cpstats`: the last-known-good snapshot and the
//! current-run output file. Both are whole-file JSON documents replaced
//! atomically on every write.

mod atomic;
pub mod current;
pub mod error;
pub mod snapshot;

pub use current::{load_current_stats, update_current_stat, write_current_stats, CurrentStats};
pub use error::StoreError;
pub use snapshot::{Snapshot, SnapshotEntry, SnapshotStore, EPOCH};
