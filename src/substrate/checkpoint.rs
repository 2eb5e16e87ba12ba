//! Checkpoint files
//!
//! A checkpoint is a sorted, immutable snapshot of the whole substrate.
//!
//! ## File Format
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │ Header (22 bytes)                                       │
//! │   Magic: "SKCP" (4) | Version: u16 (2) | Count: u64 (8) │
//! │   WAL LSN covered: u64 (8)                              │
//! ├─────────────────────────────────────────────────────────┤
//! │ Data Block (variable)                                   │
//! │   [KeyLen: u32][ValLen: u32][Key][Value]                │
//! │   ... repeated for each entry, ascending key order ...  │
//! ├─────────────────────────────────────────────────────────┤
//! │ Footer (8 bytes)                                        │
//! │   DataCRC: u32 (4) | Padding (4)                        │
//! └─────────────────────────────────────────────────────────┘
//! ```
//! Files are written to a temporary name and renamed into place, so a
//! crash mid-write leaves the previous checkpoint intact.

use std::collections::BTreeMap;
use std::fs::{self, File, OpenOptions};
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use crate::error::{Result, ShardError};

use super::View;

/// Magic bytes identifying a checkpoint file
const MAGIC: &[u8; 4] = b"SKCP";

/// Current checkpoint format version
const VERSION: u16 = 1;

/// Header size: Magic (4) + Version (2) + EntryCount (8) + Lsn (8)
const HEADER_SIZE: usize = 22;

/// Footer size: DataCRC (4) + Padding (4)
const FOOTER_SIZE: usize = 8;

/// Metadata about a written checkpoint
#[derive(Debug, Clone)]
pub struct CheckpointInfo {
    /// Path to the checkpoint file
    pub path: PathBuf,
    /// Number of entries
    pub entry_count: u64,
    /// Last WAL LSN whose effects the checkpoint contains
    pub lsn: u64,
    /// File size in bytes
    pub file_size: u64,
}

/// Write a checkpoint of `view` covering the WAL up to `lsn`
pub fn write_checkpoint(path: &Path, view: &View<'_>, lsn: u64) -> Result<CheckpointInfo> {
    let tmp_path = path.with_extension("tmp");
    let file = OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(&tmp_path)?;
    let mut writer = BufWriter::new(file);

    let entry_count = view.len() as u64;
    writer.write_all(MAGIC)?;
    writer.write_all(&VERSION.to_le_bytes())?;
    writer.write_all(&entry_count.to_le_bytes())?;
    writer.write_all(&lsn.to_le_bytes())?;

    let mut hasher = crc32fast::Hasher::new();
    for (key, value) in view.iter() {
        let key_len = (key.len() as u32).to_le_bytes();
        let val_len = (value.len() as u32).to_le_bytes();
        for chunk in [&key_len[..], &val_len[..], key, value] {
            writer.write_all(chunk)?;
            hasher.update(chunk);
        }
    }

    writer.write_all(&hasher.finalize().to_le_bytes())?;
    writer.write_all(&[0u8; 4])?;
    writer.flush()?;

    let file = writer
        .into_inner()
        .map_err(|e| ShardError::Storage(format!("Failed to flush checkpoint: {}", e)))?;
    file.sync_all()?;
    let file_size = file.metadata()?.len();
    drop(file);

    fs::rename(&tmp_path, path)?;
    if let Some(dir) = path.parent() {
        // Persist the rename itself
        if let Ok(dir) = File::open(dir) {
            let _ = dir.sync_all();
        }
    }

    Ok(CheckpointInfo {
        path: path.to_path_buf(),
        entry_count,
        lsn,
        file_size,
    })
}

/// Read a checkpoint back into an ordered map, verifying its checksum
///
/// Returns the entries and the WAL LSN the checkpoint covers.
pub fn read_checkpoint(path: &Path) -> Result<(BTreeMap<Vec<u8>, Vec<u8>>, u64)> {
    let mut bytes = Vec::new();
    BufReader::new(File::open(path)?).read_to_end(&mut bytes)?;

    if bytes.len() < HEADER_SIZE + FOOTER_SIZE {
        return Err(ShardError::Storage(format!(
            "checkpoint too short: {} bytes",
            bytes.len()
        )));
    }
    if &bytes[0..4] != MAGIC {
        return Err(ShardError::Storage(format!(
            "Invalid checkpoint magic: expected SKCP, got {:?}",
            &bytes[0..4]
        )));
    }
    let version = u16::from_le_bytes([bytes[4], bytes[5]]);
    if version != VERSION {
        return Err(ShardError::Storage(format!(
            "Unsupported checkpoint version: {}",
            version
        )));
    }
    let entry_count = read_u64(&bytes[6..14]);
    let lsn = read_u64(&bytes[14..22]);

    let data = &bytes[HEADER_SIZE..bytes.len() - FOOTER_SIZE];
    let footer = &bytes[bytes.len() - FOOTER_SIZE..];
    let stored_crc = u32::from_le_bytes([footer[0], footer[1], footer[2], footer[3]]);
    let actual_crc = crc32fast::hash(data);
    if stored_crc != actual_crc {
        return Err(ShardError::Storage(format!(
            "checkpoint CRC mismatch: stored {:08x}, computed {:08x}",
            stored_crc, actual_crc
        )));
    }

    let mut map = BTreeMap::new();
    let mut pos = 0;
    while pos < data.len() {
        if pos + 8 > data.len() {
            return Err(ShardError::Storage("truncated checkpoint entry".to_string()));
        }
        let key_len = read_u32(&data[pos..pos + 4]) as usize;
        let val_len = read_u32(&data[pos + 4..pos + 8]) as usize;
        pos += 8;
        if pos + key_len + val_len > data.len() {
            return Err(ShardError::Storage("truncated checkpoint entry".to_string()));
        }
        let key = data[pos..pos + key_len].to_vec();
        pos += key_len;
        let value = data[pos..pos + val_len].to_vec();
        pos += val_len;
        map.insert(key, value);
    }

    if map.len() as u64 != entry_count {
        return Err(ShardError::Storage(format!(
            "checkpoint entry count mismatch: header {}, found {}",
            entry_count,
            map.len()
        )));
    }

    Ok((map, lsn))
}

fn read_u32(bytes: &[u8]) -> u32 {
    let mut buf = [0u8; 4];
    buf.copy_from_slice(&bytes[..4]);
    u32::from_le_bytes(buf)
}

fn read_u64(bytes: &[u8]) -> u64 {
    let mut buf = [0u8; 8];
    buf.copy_from_slice(&bytes[..8]);
    u64::from_le_bytes(buf)
}
