//! WAL Reader
//!
//! Handles reading records from the WAL file.

use std::fs::File;
use std::io::{BufReader, ErrorKind, Read};
use std::path::Path;

use crate::error::{Result, ShardError};

use super::entry::MAX_RECORD_SIZE;
use super::{WalEntry, HEADER_SIZE};

/// Reads records from the WAL file
pub struct WalReader {
    reader: BufReader<File>,

    /// Byte offset of the next record
    position: u64,
}

impl WalReader {
    /// Open a WAL file for reading
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path)?;
        Ok(Self {
            reader: BufReader::new(file),
            position: 0,
        })
    }

    /// Read the next record from the WAL
    ///
    /// Returns:
    /// - `Ok(Some(entry))`: a complete, checksummed record
    /// - `Ok(None)`: clean end of file
    /// - `Err(WalCorruption)`: torn tail or checksum failure
    pub fn next_entry(&mut self) -> Result<Option<WalEntry>> {
        let mut header = [0u8; HEADER_SIZE];
        match read_full(&mut self.reader, &mut header)? {
            0 => return Ok(None),
            n if n < HEADER_SIZE => {
                return Err(ShardError::WalCorruption(format!(
                    "torn header at offset {} ({} of {} bytes)",
                    self.position, n, HEADER_SIZE
                )))
            }
            _ => {}
        }

        let (lsn, crc, len) = WalEntry::parse_header(&header);
        if len > MAX_RECORD_SIZE {
            return Err(ShardError::WalCorruption(format!(
                "implausible record length {} at offset {}",
                len, self.position
            )));
        }

        let mut data = vec![0u8; len];
        let n = read_full(&mut self.reader, &mut data)?;
        if n < len {
            return Err(ShardError::WalCorruption(format!(
                "torn record at offset {} ({} of {} data bytes)",
                self.position, n, len
            )));
        }

        let entry = WalEntry::from_parts(lsn, crc, &data)?;
        self.position += (HEADER_SIZE + len) as u64;
        Ok(Some(entry))
    }

    /// Byte offset just past the last record successfully read
    pub fn position(&self) -> u64 {
        self.position
    }

    /// Iterate over all valid records
    pub fn entries(self) -> WalIterator {
        WalIterator {
            reader: self,
            done: false,
        }
    }
}

/// Read until `buf` is full or EOF; returns bytes read
fn read_full(reader: &mut impl Read, buf: &mut [u8]) -> Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        }
    }
    Ok(filled)
}

/// Iterator over WAL records; stops after the first error
pub struct WalIterator {
    reader: WalReader,
    done: bool,
}

impl Iterator for WalIterator {
    type Item = Result<WalEntry>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.reader.next_entry() {
            Ok(Some(entry)) => Some(Ok(entry)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}
