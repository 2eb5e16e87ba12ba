//! Log entry codec
//!
//! Frames [`LogEntry`] values for the consensus log and for entry files read
//! by the CLI.
//!
//! ```text
//! ┌─────────────┬──────────┬──────────────────────────────┐
//! │ Version (1) │ Len (4)  │  bincode(LogEntry)           │
//! └─────────────┴──────────┴──────────────────────────────┘
//! ```

use std::io::{ErrorKind, Read, Write};

use crate::error::{Result, ShardError};

use super::LogEntry;

/// Current frame version
pub const FRAME_VERSION: u8 = 1;

/// Header size: 1 byte version + 4 bytes length
pub const HEADER_SIZE: usize = 5;

/// Maximum payload size (64 MB)
pub const MAX_ENTRY_SIZE: u32 = 64 * 1024 * 1024;

// =============================================================================
// Slice Encoding/Decoding
// =============================================================================

/// Encode an entry into one frame
pub fn encode_entry(entry: &LogEntry) -> Result<Vec<u8>> {
    let payload = bincode::serialize(entry)?;
    if payload.len() > MAX_ENTRY_SIZE as usize {
        return Err(ShardError::Serialization(format!(
            "Entry too large: {} bytes (max {})",
            payload.len(),
            MAX_ENTRY_SIZE
        )));
    }

    let mut frame = Vec::with_capacity(HEADER_SIZE + payload.len());
    frame.push(FRAME_VERSION);
    frame.extend_from_slice(&(payload.len() as u32).to_be_bytes());
    frame.extend_from_slice(&payload);
    Ok(frame)
}

/// Decode one frame
///
/// The slice must hold exactly one frame; trailing bytes are rejected.
pub fn decode_entry(bytes: &[u8]) -> Result<LogEntry> {
    let payload_len = parse_header(bytes)?;

    let total_len = HEADER_SIZE + payload_len;
    if bytes.len() != total_len {
        return Err(ShardError::Serialization(format!(
            "Frame length mismatch: expected {} bytes, got {}",
            total_len,
            bytes.len()
        )));
    }

    Ok(bincode::deserialize(&bytes[HEADER_SIZE..])?)
}

fn parse_header(bytes: &[u8]) -> Result<usize> {
    if bytes.len() < HEADER_SIZE {
        return Err(ShardError::Serialization(format!(
            "Incomplete header: expected {} bytes, got {}",
            HEADER_SIZE,
            bytes.len()
        )));
    }
    if bytes[0] != FRAME_VERSION {
        return Err(ShardError::Serialization(format!(
            "Unsupported frame version: {}",
            bytes[0]
        )));
    }

    let payload_len = u32::from_be_bytes([bytes[1], bytes[2], bytes[3], bytes[4]]);
    if payload_len > MAX_ENTRY_SIZE {
        return Err(ShardError::Serialization(format!(
            "Payload too large: {} bytes (max {})",
            payload_len, MAX_ENTRY_SIZE
        )));
    }
    Ok(payload_len as usize)
}

// =============================================================================
// Stream Reading/Writing
// =============================================================================

/// Write one frame to a stream
pub fn write_entry<W: Write>(writer: &mut W, entry: &LogEntry) -> Result<()> {
    writer.write_all(&encode_entry(entry)?)?;
    Ok(())
}

/// Read one frame from a stream
///
/// Returns `Ok(None)` on a clean end of stream before any header byte.
pub fn read_entry<R: Read>(reader: &mut R) -> Result<Option<LogEntry>> {
    let mut header = [0u8; HEADER_SIZE];
    match reader.read_exact(&mut header[..1]) {
        Ok(()) => {}
        Err(e) if e.kind() == ErrorKind::UnexpectedEof => return Ok(None),
        Err(e) => return Err(e.into()),
    }
    reader.read_exact(&mut header[1..]).map_err(truncated)?;

    let payload_len = parse_header(&header)?;
    let mut payload = vec![0u8; payload_len];
    reader.read_exact(&mut payload).map_err(truncated)?;

    Ok(Some(bincode::deserialize(&payload)?))
}

fn truncated(e: std::io::Error) -> ShardError {
    if e.kind() == ErrorKind::UnexpectedEof {
        ShardError::Serialization("Truncated log entry frame".to_string())
    } else {
        e.into()
    }
}
