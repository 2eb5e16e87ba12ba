//! Substrate manager
//!
//! Ties the MemTable, the WAL and checkpoint files together.
//!
//! ## Concurrency:
//! - `wal`: Mutex held across "append to WAL, apply to MemTable" so the
//!   order of visibility equals the order in the log
//! - `memtable`: internal RwLock; readers take views, batches apply exclusively
//! - All methods use `&self`

use std::fs;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;

use crate::config::WalSyncStrategy;
use crate::error::Result;
use crate::wal::{WalRecovery, WalWriter};

use super::{read_checkpoint, write_checkpoint, CheckpointInfo, MemTable, View, WriteBatch};

/// Durable ordered byte-key store
pub struct Substrate {
    /// Directory holding the WAL and checkpoint
    dir: PathBuf,

    /// Write-ahead log (exclusive access needed)
    wal: Mutex<WalWriter>,

    /// Live key space
    memtable: MemTable,

    /// WAL size that triggers a checkpoint (0 = never)
    checkpoint_wal_bytes: u64,
}

impl Substrate {
    // =========================================================================
    // Internal Path Constants
    // =========================================================================
    const WAL_FILENAME: &'static str = "wal.log";
    const CHECKPOINT_FILENAME: &'static str = "checkpoint.sst";

    /// Open or create a substrate in `dir`
    ///
    /// On startup:
    /// 1. Load the checkpoint if one exists
    /// 2. Replay WAL batches newer than the checkpoint
    /// 3. Continue the WAL after the last recovered LSN
    pub fn open(dir: &Path, sync_strategy: WalSyncStrategy, checkpoint_wal_bytes: u64) -> Result<Self> {
        fs::create_dir_all(dir)?;

        let checkpoint_path = dir.join(Self::CHECKPOINT_FILENAME);
        let wal_path = dir.join(Self::WAL_FILENAME);

        let (map, checkpoint_lsn) = if checkpoint_path.exists() {
            read_checkpoint(&checkpoint_path)?
        } else {
            (Default::default(), 0)
        };
        let memtable = MemTable::from_map(map);

        let mut last_lsn = checkpoint_lsn;
        if wal_path.exists() {
            let (entries, recovery) = WalRecovery::recover(&wal_path)?;
            if recovery.entries_recovered > 0 || recovery.entries_corrupted > 0 {
                tracing::info!(
                    recovered = recovery.entries_recovered,
                    corrupted = recovery.entries_corrupted,
                    last_lsn = recovery.last_lsn,
                    "WAL recovery"
                );
            }

            let mut replayed = 0u64;
            for entry in entries {
                // Already folded into the checkpoint
                if entry.lsn <= checkpoint_lsn {
                    continue;
                }
                memtable.apply_operations(&entry.operations);
                replayed += 1;
            }
            if replayed > 0 {
                tracing::debug!(replayed, "replayed WAL batches over checkpoint");
            }
            last_lsn = last_lsn.max(recovery.last_lsn);
        }

        let wal = WalWriter::open_at(&wal_path, sync_strategy, last_lsn)?;

        Ok(Self {
            dir: dir.to_path_buf(),
            wal: Mutex::new(wal),
            memtable,
            checkpoint_wal_bytes,
        })
    }

    /// Get a copy of the value for a key
    pub fn get(&self, key: &[u8]) -> Option<Vec<u8>> {
        self.memtable.get(key)
    }

    /// Take a consistent read view
    pub fn view(&self) -> View<'_> {
        self.memtable.view()
    }

    /// Durably apply a batch: WAL first, then the MemTable
    ///
    /// Empty batches are ignored. Once the batch is logged and applied the
    /// write has succeeded: a failed automatic checkpoint is only logged, and
    /// the next write past the threshold tries again.
    pub fn write(&self, batch: WriteBatch) -> Result<()> {
        if batch.is_empty() {
            return Ok(());
        }

        let mut wal = self.wal.lock();
        let operations = batch.into_operations();
        wal.append(operations.clone())?;
        self.memtable.apply_operations(&operations);

        if self.checkpoint_wal_bytes > 0 && wal.size_bytes() >= self.checkpoint_wal_bytes {
            if let Err(e) = self.checkpoint_locked(&mut wal) {
                tracing::warn!(
                    error = %e,
                    wal_bytes = wal.size_bytes(),
                    "automatic checkpoint failed, retrying on a later write"
                );
            }
        }
        Ok(())
    }

    /// Write a checkpoint now and truncate the WAL
    pub fn checkpoint(&self) -> Result<CheckpointInfo> {
        let mut wal = self.wal.lock();
        self.checkpoint_locked(&mut wal)
    }

    fn checkpoint_locked(&self, wal: &mut WalWriter) -> Result<CheckpointInfo> {
        wal.sync()?;
        let lsn = wal.current_lsn();
        let info = {
            let view = self.memtable.view();
            write_checkpoint(&self.dir.join(Self::CHECKPOINT_FILENAME), &view, lsn)?
        };
        wal.truncate()?;

        tracing::info!(
            entries = info.entry_count,
            lsn = info.lsn,
            bytes = info.file_size,
            "checkpoint written"
        );
        Ok(info)
    }

    /// Sync the WAL to disk
    pub fn sync(&self) -> Result<()> {
        self.wal.lock().sync()
    }

    // =========================================================================
    // Accessors (for testing and debugging)
    // =========================================================================

    /// Get the data directory path
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Get the number of live entries
    pub fn entry_count(&self) -> usize {
        self.memtable.entry_count()
    }

    /// Get the current WAL size in bytes
    pub fn wal_size(&self) -> u64 {
        self.wal.lock().size_bytes()
    }
}
