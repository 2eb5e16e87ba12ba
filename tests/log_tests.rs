//! Tests for log entry framing
//!
//! These tests verify:
//! - Frame header layout
//! - Exact-length decoding
//! - Stream reading with clean EOF and truncated frames

use std::io::Cursor;

use shardkv::codec::ScoreBound;
use shardkv::log::{
    decode_entry, encode_entry, read_entry, write_entry, Command, LogEntry, FRAME_VERSION, HEADER_SIZE,
};
use shardkv::ShardError;

// =============================================================================
// Helper Functions
// =============================================================================

fn sample_entries() -> Vec<LogEntry> {
    vec![
        LogEntry::new(
            1,
            Command::Set {
                key: b"t:a".to_vec(),
                value: b"1".to_vec(),
            },
        ),
        LogEntry::new(
            2,
            Command::ZRemRangeByScore {
                key: b"t:z".to_vec(),
                min: ScoreBound::NegInf,
                max: ScoreBound::Exclusive(10),
            },
        ),
        LogEntry::new(
            3,
            Command::MSet {
                pairs: vec![(b"t:x".to_vec(), b"x".to_vec()), (b"t:y".to_vec(), Vec::new())],
            },
        ),
    ]
}

// =============================================================================
// Frame Tests
// =============================================================================

#[test]
fn test_frame_header() {
    let entry = &sample_entries()[0];
    let frame = encode_entry(entry).unwrap();

    assert_eq!(frame[0], FRAME_VERSION);
    let len = u32::from_be_bytes(frame[1..5].try_into().unwrap()) as usize;
    assert_eq!(frame.len(), HEADER_SIZE + len);
    assert_eq!(&decode_entry(&frame).unwrap(), entry);
}

#[test]
fn test_decode_rejects_trailing_bytes() {
    let mut frame = encode_entry(&sample_entries()[0]).unwrap();
    frame.push(0);

    assert!(matches!(decode_entry(&frame), Err(ShardError::Serialization(_))));
}

#[test]
fn test_decode_rejects_unknown_version() {
    let mut frame = encode_entry(&sample_entries()[0]).unwrap();
    frame[0] = FRAME_VERSION + 1;

    assert!(matches!(decode_entry(&frame), Err(ShardError::Serialization(_))));
}

#[test]
fn test_decode_rejects_short_header() {
    assert!(matches!(decode_entry(&[FRAME_VERSION, 0]), Err(ShardError::Serialization(_))));
}

// =============================================================================
// Stream Tests
// =============================================================================

#[test]
fn test_stream_reads_every_entry_then_eof() {
    let entries = sample_entries();
    let mut buf = Vec::new();
    for entry in &entries {
        write_entry(&mut buf, entry).unwrap();
    }

    let mut cursor = Cursor::new(buf);
    let mut read = Vec::new();
    while let Some(entry) = read_entry(&mut cursor).unwrap() {
        read.push(entry);
    }

    assert_eq!(read, entries);
}

#[test]
fn test_stream_empty_is_clean_eof() {
    let mut cursor = Cursor::new(Vec::<u8>::new());
    assert!(read_entry(&mut cursor).unwrap().is_none());
}

#[test]
fn test_stream_truncated_frame_is_an_error() {
    let mut buf = Vec::new();
    write_entry(&mut buf, &sample_entries()[0]).unwrap();
    buf.truncate(buf.len() - 2);

    let mut cursor = Cursor::new(buf);
    assert!(matches!(read_entry(&mut cursor), Err(ShardError::Serialization(_))));
}

#[test]
fn test_command_names() {
    let names: Vec<&str> = sample_entries().iter().map(|e| e.command.name()).collect();
    assert_eq!(names, vec!["SET", "ZREMRANGEBYSCORE", "MSET"]);
}
