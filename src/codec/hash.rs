//! Hash encodings
//!
//! - `HSIZE [table][rest]` → field count
//! - `HASH  [table][rest][field]` → field value

use crate::error::{Result, ShardError};

use super::key::{decode_key, encode_root, encode_sub, sub_prefix, TableKey};
use super::tag;

/// Root record holding the field count
pub fn hsize_key(key: &TableKey<'_>) -> Vec<u8> {
    encode_root(tag::HSIZE, key)
}

pub fn encode_hash_field(key: &TableKey<'_>, field: &[u8]) -> Vec<u8> {
    encode_sub(tag::HASH, key, field)
}

/// Prefix of every field record of one hash
pub fn hash_field_prefix(key: &TableKey<'_>) -> Vec<u8> {
    sub_prefix(tag::HASH, key)
}

/// Extract the field name from a field record key
pub fn decode_hash_field(encoded: &[u8]) -> Result<&[u8]> {
    let decoded = decode_key(encoded)?;
    if decoded.tag != tag::HASH {
        return Err(ShardError::Storage(format!(
            "expected hash field key, found tag {:#04x}",
            decoded.tag
        )));
    }
    Ok(decoded.suffix)
}
