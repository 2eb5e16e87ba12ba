//! WAL Entry definitions
//!
//! Defines the structure of individual WAL records and their byte framing.

use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use crate::error::{Result, ShardError};

/// Header size: LSN (8) + CRC (4) + Len (4)
pub const HEADER_SIZE: usize = 16;

/// Upper bound for a single record payload (256 MB)
pub(crate) const MAX_RECORD_SIZE: usize = 256 * 1024 * 1024;

/// A single record in the WAL
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalEntry {
    /// Log Sequence Number - monotonically increasing
    pub lsn: u64,

    /// The operations of one write batch, applied together
    pub operations: Vec<Operation>,

    /// Timestamp (unix millis) when the record was created
    pub timestamp: u64,
}

/// Operations that can be logged
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Operation {
    /// Put a key-value pair
    Put { key: Vec<u8>, value: Vec<u8> },

    /// Delete a key
    Delete { key: Vec<u8> },
}

/// Payload portion of a record (everything except the LSN)
#[derive(Serialize, Deserialize)]
struct Payload {
    operations: Vec<Operation>,
    timestamp: u64,
}

impl WalEntry {
    /// Create a new entry stamped with the current wall-clock time
    pub fn new(lsn: u64, operations: Vec<Operation>) -> Self {
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0);

        Self {
            lsn,
            operations,
            timestamp,
        }
    }

    /// Serialize to `[LSN][CRC][Len][Data]`
    pub fn serialize(&self) -> Result<Vec<u8>> {
        let payload = Payload {
            operations: self.operations.clone(),
            timestamp: self.timestamp,
        };
        let data = bincode::serialize(&payload)?;
        if data.len() > MAX_RECORD_SIZE {
            return Err(ShardError::Storage(format!(
                "WAL record too large: {} bytes",
                data.len()
            )));
        }

        let crc = crc32fast::hash(&data);

        let mut bytes = Vec::with_capacity(HEADER_SIZE + data.len());
        bytes.extend_from_slice(&self.lsn.to_le_bytes());
        bytes.extend_from_slice(&crc.to_le_bytes());
        bytes.extend_from_slice(&(data.len() as u32).to_le_bytes());
        bytes.extend_from_slice(&data);
        Ok(bytes)
    }

    /// Deserialize a complete record, verifying its checksum
    pub fn deserialize(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < HEADER_SIZE {
            return Err(ShardError::WalCorruption(format!(
                "record shorter than header: {} bytes",
                bytes.len()
            )));
        }

        let (lsn, crc, len) = Self::parse_header(&bytes[..HEADER_SIZE]);
        if bytes.len() < HEADER_SIZE + len {
            return Err(ShardError::WalCorruption(format!(
                "truncated record at lsn {}: expected {} data bytes, got {}",
                lsn,
                len,
                bytes.len() - HEADER_SIZE
            )));
        }

        Self::from_parts(lsn, crc, &bytes[HEADER_SIZE..HEADER_SIZE + len])
    }

    /// Split a header into (lsn, crc, data_len)
    pub(crate) fn parse_header(header: &[u8]) -> (u64, u32, usize) {
        let mut lsn = [0u8; 8];
        lsn.copy_from_slice(&header[0..8]);
        let mut crc = [0u8; 4];
        crc.copy_from_slice(&header[8..12]);
        let mut len = [0u8; 4];
        len.copy_from_slice(&header[12..16]);

        (
            u64::from_le_bytes(lsn),
            u32::from_le_bytes(crc),
            u32::from_le_bytes(len) as usize,
        )
    }

    /// Rebuild an entry from its header fields and data, checking the CRC
    pub(crate) fn from_parts(lsn: u64, crc: u32, data: &[u8]) -> Result<Self> {
        let actual = crc32fast::hash(data);
        if actual != crc {
            return Err(ShardError::WalCorruption(format!(
                "CRC mismatch at lsn {}: stored {:08x}, computed {:08x}",
                lsn, crc, actual
            )));
        }

        let payload: Payload = bincode::deserialize(data)?;
        Ok(Self {
            lsn,
            operations: payload.operations,
            timestamp: payload.timestamp,
        })
    }
}
