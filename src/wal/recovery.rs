//! WAL Recovery
//!
//! Handles crash recovery by replaying the WAL.

use std::fs::OpenOptions;
use std::path::Path;

use crate::error::{Result, ShardError};

use super::{WalEntry, WalReader};

/// Handles WAL recovery after crash
pub struct WalRecovery;

/// Result of a recovery operation
#[derive(Debug, Default)]
pub struct RecoveryResult {
    /// Number of records successfully recovered
    pub entries_recovered: u64,

    /// Number of corrupted records dropped (at most one: the torn tail)
    pub entries_corrupted: u64,

    /// Last valid LSN
    pub last_lsn: u64,

    /// Whether the WAL was truncated (partial writes removed)
    pub was_truncated: bool,
}

impl WalRecovery {
    /// Recover records from a WAL file
    ///
    /// This will:
    /// 1. Read records until the end or the first bad one
    /// 2. Treat the first torn or CRC-failing record as the end of the log
    /// 3. Truncate the file after the last good record
    /// 4. Return all valid records in order
    pub fn recover(path: &Path) -> Result<(Vec<WalEntry>, RecoveryResult)> {
        let (entries, result, valid_len) = Self::scan(path)?;

        if result.was_truncated {
            let file = OpenOptions::new().write(true).open(path)?;
            file.set_len(valid_len)?;
            file.sync_all()?;
            tracing::warn!(
                path = %path.display(),
                valid_len,
                "truncated torn WAL tail"
            );
        }

        Ok((entries, result))
    }

    /// Verify integrity of a WAL file without modifying it
    pub fn verify(path: &Path) -> Result<RecoveryResult> {
        let (_, result, _) = Self::scan(path)?;
        Ok(result)
    }

    fn scan(path: &Path) -> Result<(Vec<WalEntry>, RecoveryResult, u64)> {
        let mut reader = WalReader::open(path)?;
        let mut entries = Vec::new();
        let mut result = RecoveryResult::default();

        loop {
            match reader.next_entry() {
                Ok(Some(entry)) => {
                    if entry.lsn <= result.last_lsn {
                        return Err(ShardError::WalCorruption(format!(
                            "non-increasing lsn {} after {}",
                            entry.lsn, result.last_lsn
                        )));
                    }
                    result.last_lsn = entry.lsn;
                    result.entries_recovered += 1;
                    entries.push(entry);
                }
                Ok(None) => break,
                Err(ShardError::WalCorruption(reason)) => {
                    tracing::debug!(%reason, "WAL scan stopped at corrupt record");
                    result.entries_corrupted += 1;
                    result.was_truncated = true;
                    break;
                }
                Err(e) => return Err(e),
            }
        }

        let valid_len = reader.position();
        Ok((entries, result, valid_len))
    }
}
