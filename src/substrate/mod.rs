//! Substrate Module
//!
//! The ordered byte-key store beneath the storage engine. It offers exactly
//! what the type encodings need: point get, ordered range scans and atomic
//! batch writes of puts and deletes.
//!
//! ## Responsibilities
//! - Keep the live key space in an ordered in-memory table
//! - Make each write batch durable in the WAL before it becomes visible
//! - Apply a batch under one exclusive lock so readers never see half of it
//! - Periodically write a sorted checkpoint and truncate the WAL
//!
//! ## Layout on disk
//! ```text
//! {data_dir}/
//!   ├── checkpoint.sst   sorted snapshot (see checkpoint format)
//!   └── wal.log          batches written since the snapshot
//! ```

mod batch;
mod checkpoint;
mod manager;
mod memtable;

pub use batch::WriteBatch;
pub use checkpoint::{read_checkpoint, write_checkpoint, CheckpointInfo};
pub use manager::Substrate;
pub use memtable::{MemTable, View};

/// Smallest key strictly greater than every key starting with `prefix`
///
/// Returns `None` when no such key exists (prefix is empty or all 0xFF).
pub fn prefix_end(prefix: &[u8]) -> Option<Vec<u8>> {
    let mut end = prefix.to_vec();
    while let Some(last) = end.pop() {
        if last < 0xFF {
            end.push(last + 1);
            return Some(end);
        }
    }
    None
}
