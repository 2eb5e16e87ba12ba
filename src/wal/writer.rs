//! WAL Writer
//!
//! Handles appending records to the WAL file.

use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use crate::config::WalSyncStrategy;
use crate::error::{Result, ShardError};

use super::{Operation, WalEntry};

/// Writes records to the WAL file
pub struct WalWriter {
    /// Path of the log file
    path: PathBuf,

    /// Buffered handle positioned at the end of the file
    writer: BufWriter<File>,

    /// LSN assigned to the most recent record (0 = none yet)
    current_lsn: u64,

    /// When to fsync
    sync_strategy: WalSyncStrategy,

    /// Records appended since the last fsync
    unsynced: usize,

    /// Current file size in bytes
    size_bytes: u64,
}

impl WalWriter {
    /// Open or create a WAL file, appending after any existing records
    ///
    /// The caller is expected to have run recovery first so the file ends on a
    /// record boundary; `start_lsn` is the last LSN recovery saw.
    pub fn open_at(path: &Path, sync_strategy: WalSyncStrategy, start_lsn: u64) -> Result<Self> {
        let mut file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .open(path)?;
        let size_bytes = file.seek(SeekFrom::End(0))?;

        Ok(Self {
            path: path.to_path_buf(),
            writer: BufWriter::new(file),
            current_lsn: start_lsn,
            sync_strategy,
            unsynced: 0,
            size_bytes,
        })
    }

    /// Open or create a WAL file with LSNs starting from 1
    pub fn open(path: &Path, sync_strategy: WalSyncStrategy) -> Result<Self> {
        Self::open_at(path, sync_strategy, 0)
    }

    /// Append a batch of operations as one record, returning its LSN
    pub fn append(&mut self, operations: Vec<Operation>) -> Result<u64> {
        let lsn = self.current_lsn + 1;
        let entry = WalEntry::new(lsn, operations);
        let bytes = entry.serialize()?;

        self.writer
            .write_all(&bytes)
            .map_err(|e| ShardError::Storage(format!("WAL append failed: {}", e)))?;
        self.writer.flush()?;

        self.current_lsn = lsn;
        self.size_bytes += bytes.len() as u64;
        self.unsynced += 1;

        let should_sync = match self.sync_strategy {
            WalSyncStrategy::EveryWrite => true,
            WalSyncStrategy::EveryNEntries { count } => self.unsynced >= count.max(1),
        };
        if should_sync {
            self.sync()?;
        }

        Ok(lsn)
    }

    /// Force sync to disk
    pub fn sync(&mut self) -> Result<()> {
        self.writer.flush()?;
        self.writer.get_ref().sync_data()?;
        self.unsynced = 0;
        Ok(())
    }

    /// Drop every record (after their effects became durable elsewhere)
    ///
    /// LSNs keep increasing across truncation.
    pub fn truncate(&mut self) -> Result<()> {
        self.writer.flush()?;
        let file = self.writer.get_mut();
        file.set_len(0)?;
        file.seek(SeekFrom::Start(0))?;
        file.sync_all()?;
        self.size_bytes = 0;
        self.unsynced = 0;
        Ok(())
    }

    /// Get the current LSN
    pub fn current_lsn(&self) -> u64 {
        self.current_lsn
    }

    /// Get the current file size in bytes
    pub fn size_bytes(&self) -> u64 {
        self.size_bytes
    }

    /// Get the file path
    pub fn path(&self) -> &Path {
        &self.path
    }
}
