//! Set encodings
//!
//! - `SSIZE [table][rest]` → cardinality
//! - `SET   [table][rest][member]` → empty

use crate::error::{Result, ShardError};

use super::key::{decode_key, encode_root, encode_sub, sub_prefix, TableKey};
use super::tag;

/// Root record holding the cardinality
pub fn ssize_key(key: &TableKey<'_>) -> Vec<u8> {
    encode_root(tag::SSIZE, key)
}

pub fn encode_set_member(key: &TableKey<'_>, member: &[u8]) -> Vec<u8> {
    encode_sub(tag::SET, key, member)
}

pub fn set_member_prefix(key: &TableKey<'_>) -> Vec<u8> {
    sub_prefix(tag::SET, key)
}

pub fn decode_set_member(encoded: &[u8]) -> Result<&[u8]> {
    let decoded = decode_key(encoded)?;
    if decoded.tag != tag::SET {
        return Err(ShardError::Storage(format!(
            "expected set member key, found tag {:#04x}",
            decoded.tag
        )));
    }
    Ok(decoded.suffix)
}
