//! Codec Module
//!
//! State-free byte encodings for every record the storage engine writes.
//!
//! ## Key Layout
//! ```text
//! ┌─────────┬──────────────┬───────┬─────────────┬──────┬──────────────────┐
//! │ Tag (1) │ TableLen (2) │ Table │ RestLen (4) │ Rest │ Type suffix ...  │
//! └─────────┴──────────────┴───────┴─────────────┴──────┴──────────────────┘
//! ```
//! - `Tag` separates types, so a scan never crosses from one type into another
//! - `Table` is the user key prefix before the first delimiter; it is length
//!   prefixed so every key of one (type, table) pair shares one scan prefix
//! - `Rest` is length prefixed so a suffix can never be mistaken for part of it
//! - Integers are big-endian; signed ones have their sign bit flipped so byte
//!   order equals numeric order
//!
//! Each data type owns one *root* record per user key (the string value, or a
//! size/meta record for collections). Roots are what table counters count and
//! what type checks look up.

mod key;
mod hash;
mod list;
mod set;
mod zset;
mod table;

pub use key::{
    decode_key, encode_root, encode_sub, sub_prefix, table_prefix, DecodedKey, TableKey,
};
pub use hash::{decode_hash_field, encode_hash_field, hash_field_prefix, hsize_key};
pub use list::{
    decode_list_seq, encode_list_item, lmeta_key, ListMeta, LIST_INITIAL_SEQ,
};
pub use set::{decode_set_member, encode_set_member, set_member_prefix, ssize_key};
pub use zset::{
    decode_zscore_key, encode_zscore_key, encode_zset_member, zscore_prefix, zsize_key,
    LexBound, ScoreBound,
};
pub use table::{applied_index_key, table_count_key};

use crate::error::{Result, ShardError};

/// Type tags; the first byte of every encoded key
pub mod tag {
    /// String value (root)
    pub const KV: u8 = 0x01;
    /// Hash field
    pub const HASH: u8 = 0x02;
    /// Hash field count (root)
    pub const HSIZE: u8 = 0x03;
    /// List element
    pub const LIST: u8 = 0x04;
    /// List head/tail sequence (root)
    pub const LMETA: u8 = 0x05;
    /// Set member
    pub const SET: u8 = 0x06;
    /// Set cardinality (root)
    pub const SSIZE: u8 = 0x07;
    /// Sorted set member → score
    pub const ZSET: u8 = 0x08;
    /// Sorted set cardinality (root)
    pub const ZSIZE: u8 = 0x09;
    /// Sorted set (score, member) index
    pub const ZSCORE: u8 = 0x0A;
    /// Per-table key counter
    pub const TABLE_COUNT: u8 = 0x10;
    /// Engine bookkeeping
    pub const META: u8 = 0xF0;
}

/// The kind of value a user key holds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataType {
    String,
    Hash,
    List,
    Set,
    ZSet,
}

impl DataType {
    /// All data types, in the order type checks visit them
    pub const ALL: [DataType; 5] = [
        DataType::String,
        DataType::Hash,
        DataType::List,
        DataType::Set,
        DataType::ZSet,
    ];

    /// Tag of this type's root record
    pub fn root_tag(self) -> u8 {
        match self {
            DataType::String => tag::KV,
            DataType::Hash => tag::HSIZE,
            DataType::List => tag::LMETA,
            DataType::Set => tag::SSIZE,
            DataType::ZSet => tag::ZSIZE,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            DataType::String => "string",
            DataType::Hash => "hash",
            DataType::List => "list",
            DataType::Set => "set",
            DataType::ZSet => "zset",
        }
    }
}

impl std::fmt::Display for DataType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

// =============================================================================
// Integer value helpers
// =============================================================================

/// Encode an i64 so that byte order equals numeric order
pub fn encode_sortable_i64(v: i64) -> [u8; 8] {
    ((v as u64) ^ (1 << 63)).to_be_bytes()
}

/// Inverse of [`encode_sortable_i64`]
pub fn decode_sortable_i64(bytes: &[u8]) -> Result<i64> {
    let raw = fixed8(bytes)?;
    Ok((u64::from_be_bytes(raw) ^ (1 << 63)) as i64)
}

/// Encode a plain i64 value (counters, sizes, scores)
pub fn encode_i64(v: i64) -> [u8; 8] {
    v.to_be_bytes()
}

/// Decode a plain i64 value
pub fn decode_i64(bytes: &[u8]) -> Result<i64> {
    Ok(i64::from_be_bytes(fixed8(bytes)?))
}

/// Decode a plain u64 value (log positions)
pub fn decode_u64(bytes: &[u8]) -> Result<u64> {
    Ok(u64::from_be_bytes(fixed8(bytes)?))
}

fn fixed8(bytes: &[u8]) -> Result<[u8; 8]> {
    if bytes.len() != 8 {
        return Err(ShardError::Storage(format!(
            "corrupt integer record: {} bytes",
            bytes.len()
        )));
    }
    let mut raw = [0u8; 8];
    raw.copy_from_slice(bytes);
    Ok(raw)
}
