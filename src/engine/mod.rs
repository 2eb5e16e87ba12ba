//! Engine Module
//!
//! The storage engine of one partition replica. It implements string, bit,
//! hash, list, set and sorted-set operations purely as byte-key encodings
//! (see [`codec`](crate::codec)) over the [`Substrate`].
//!
//! ## Responsibilities
//! - Validate user keys against the table layout
//! - Reject operations against a key holding another type
//! - Stage each call's writes and commit them as one atomic batch
//! - Keep exact per-table key counters inside that same batch
//! - Apply committed log entries exactly once (see [`Engine::apply`])
//!
//! ## Concurrency Model: Single-Writer / Multiple-Reader (SWMR)
//!
//! - **Writes**: serialized by `write_lock`; each call stages into a
//!   `WriteTxn` and commits one batch (WAL, then MemTable under its write lock)
//! - **Reads**: take one substrate view per call, so multi-step reads see one
//!   committed state and never half of a batch

mod apply;
mod hash;
mod kv;
mod list;
mod scan;
mod set;
mod txn;
mod zset;

pub use zset::{flatten_scored, ScorePair};

use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;

use crate::codec::{
    applied_index_key, decode_i64, decode_u64, encode_root, table_count_key, DataType, TableKey,
};
use crate::config::Config;
use crate::error::{Result, ShardError};
use crate::substrate::{CheckpointInfo, Substrate, View};

use txn::{KeyLookup, WriteTxn};

/// Storage engine for one partition replica
pub struct Engine {
    /// Engine configuration
    config: Config,

    /// Durable ordered key space
    substrate: Substrate,

    /// Serializes write operations
    write_lock: Mutex<()>,

    /// Set by [`Engine::close`]; every later call fails with `Closed`
    closed: AtomicBool,
}

impl Engine {
    /// Open or create an engine with the given config
    ///
    /// On startup the substrate loads its checkpoint and replays its WAL, so
    /// every committed batch (table counters and applied index included) is
    /// restored before the first call.
    pub fn open(config: Config) -> Result<Self> {
        let substrate = Substrate::open(
            &config.data_dir,
            config.wal_sync_strategy,
            config.checkpoint_wal_bytes,
        )?;

        let engine = Self {
            config,
            substrate,
            write_lock: Mutex::new(()),
            closed: AtomicBool::new(false),
        };

        tracing::info!(
            data_dir = %engine.config.data_dir.display(),
            entries = engine.substrate.entry_count(),
            applied_index = engine.applied_index()?,
            "engine opened"
        );
        Ok(engine)
    }

    /// Flush the WAL and refuse further calls
    ///
    /// Closing twice is a no-op.
    pub fn close(&self) -> Result<()> {
        let _guard = self.write_lock.lock();
        if self.closed.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        self.substrate.sync()?;
        tracing::info!(data_dir = %self.config.data_dir.display(), "engine closed");
        Ok(())
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Write a substrate checkpoint and truncate the WAL
    pub fn checkpoint(&self) -> Result<CheckpointInfo> {
        self.ensure_open()?;
        let _guard = self.write_lock.lock();
        self.substrate.checkpoint()
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    // =========================================================================
    // Engine-wide reads
    // =========================================================================

    /// Number of user keys (of any type) currently stored under `table`
    pub fn get_table_key_count(&self, table: &[u8]) -> Result<i64> {
        self.ensure_open()?;
        match self.substrate.get(&table_count_key(table)) {
            Some(raw) => decode_i64(&raw),
            None => Ok(0),
        }
    }

    /// Highest committed log position reflected in engine state (0 = none)
    pub fn applied_index(&self) -> Result<u64> {
        self.ensure_open()?;
        self.read_applied_index()
    }

    /// Which type, if any, a user key currently holds
    pub fn key_type(&self, key: &[u8]) -> Result<Option<DataType>> {
        let tk = self.table_key(key)?;
        let view = self.view()?;
        Ok(DataType::ALL
            .into_iter()
            .find(|t| view.contains(&encode_root(t.root_tag(), &tk))))
    }

    // =========================================================================
    // Internal helpers
    // =========================================================================

    fn ensure_open(&self) -> Result<()> {
        if self.is_closed() {
            return Err(ShardError::Closed);
        }
        Ok(())
    }

    fn read_applied_index(&self) -> Result<u64> {
        match self.substrate.get(&applied_index_key()) {
            Some(raw) => decode_u64(&raw),
            None => Ok(0),
        }
    }

    /// Split a user key according to the table configuration
    fn table_key<'k>(&self, key: &'k [u8]) -> Result<TableKey<'k>> {
        TableKey::parse(key, self.config.table_delimiter, self.config.table_counter)
    }

    /// Take a read view for one call
    fn view(&self) -> Result<View<'_>> {
        self.ensure_open()?;
        Ok(self.substrate.view())
    }

    fn begin(&self) -> WriteTxn<'_> {
        WriteTxn::new(&self.substrate, self.config.table_counter)
    }

    /// Run a mutation and commit its writes as one batch
    fn write<T>(&self, f: impl FnOnce(&mut WriteTxn<'_>) -> Result<T>) -> Result<T> {
        self.ensure_open()?;
        let _guard = self.write_lock.lock();

        let mut txn = self.begin();
        let out = f(&mut txn)?;
        self.substrate.write(txn.into_batch()?)?;
        Ok(out)
    }

    /// Run a mutation at log position `index`
    ///
    /// Returns `Ok(None)` without writing when `index` was already applied.
    /// A failing mutation discards its staged writes but still records the
    /// position, then surfaces the error.
    fn write_at<T>(
        &self,
        index: u64,
        f: impl FnOnce(&mut WriteTxn<'_>) -> Result<T>,
    ) -> Result<Option<T>> {
        self.ensure_open()?;
        let _guard = self.write_lock.lock();

        if index <= self.read_applied_index()? {
            return Ok(None);
        }

        let mut txn = self.begin();
        let outcome = f(&mut txn);
        if outcome.is_err() {
            txn = self.begin();
        }
        txn.put(applied_index_key(), index.to_be_bytes().to_vec());
        self.substrate.write(txn.into_batch()?)?;

        outcome.map(Some)
    }
}

impl Drop for Engine {
    fn drop(&mut self) {
        if !self.is_closed() {
            if let Err(e) = self.substrate.sync() {
                tracing::warn!(error = %e, "failed to sync WAL on drop");
            }
        }
    }
}

// =============================================================================
// Shared helpers
// =============================================================================

/// Fail with `TypeMismatch` if the key holds any type other than `expected`
fn check_type<L: KeyLookup>(src: &L, key: &TableKey<'_>, expected: DataType) -> Result<()> {
    for other in DataType::ALL {
        if other != expected && src.contains(&encode_root(other.root_tag(), key)) {
            return Err(ShardError::TypeMismatch);
        }
    }
    Ok(())
}

/// Parse a stored or supplied value as a decimal i64
fn parse_int(raw: &[u8]) -> Result<i64> {
    std::str::from_utf8(raw)
        .ok()
        .and_then(|s| s.parse::<i64>().ok())
        .ok_or_else(|| ShardError::invalid("value is not an integer or out of range"))
}

/// Resolve a rank range against a length (list and sorted-set rules)
///
/// Negative positions count from the end; `start` clamps to 0 and `stop` to
/// `len - 1`. Returns `None` when the resolved range is empty.
fn resolve_rank_range(start: i64, stop: i64, len: i64) -> Option<(i64, i64)> {
    let mut start = if start < 0 { start + len } else { start };
    let mut stop = if stop < 0 { stop + len } else { stop };
    if start < 0 {
        start = 0;
    }
    if stop >= len {
        stop = len - 1;
    }
    if start > stop || start >= len {
        return None;
    }
    Some((start, stop))
}

/// Resolve a single position (negative counts from the end)
fn resolve_index(index: i64, len: i64) -> Option<i64> {
    let index = if index < 0 { index + len } else { index };
    if index < 0 || index >= len {
        None
    } else {
        Some(index)
    }
}

fn ensure_not_empty<T>(items: &[T], what: &str) -> Result<()> {
    if items.is_empty() {
        return Err(ShardError::invalid(format!("no {} given", what)));
    }
    Ok(())
}
