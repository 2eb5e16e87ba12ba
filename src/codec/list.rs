//! List encodings
//!
//! - `LMETA [table][rest]` → head (8) | tail (8)
//! - `LIST  [table][rest][seq]` → element
//!
//! Elements occupy sequence numbers `head..tail`. Pushing on the left
//! decrements `head`, pushing on the right increments `tail`; the sortable
//! sequence encoding keeps elements in list order under a prefix scan.

use crate::error::{Result, ShardError};

use super::key::{decode_key, encode_root, encode_sub, TableKey};
use super::{decode_sortable_i64, encode_sortable_i64, tag};

/// Sequence number of the first element pushed into an empty list
pub const LIST_INITIAL_SEQ: i64 = 0;

/// Head and tail sequence numbers of one list
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListMeta {
    /// Sequence of the first element
    pub head: i64,
    /// One past the sequence of the last element
    pub tail: i64,
}

impl ListMeta {
    pub fn empty() -> Self {
        Self {
            head: LIST_INITIAL_SEQ,
            tail: LIST_INITIAL_SEQ,
        }
    }

    pub fn len(&self) -> i64 {
        self.tail - self.head
    }

    pub fn is_empty(&self) -> bool {
        self.len() <= 0
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(16);
        out.extend_from_slice(&self.head.to_be_bytes());
        out.extend_from_slice(&self.tail.to_be_bytes());
        out
    }

    pub fn decode(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != 16 {
            return Err(ShardError::Storage(format!(
                "corrupt list meta: {} bytes",
                bytes.len()
            )));
        }
        let mut head = [0u8; 8];
        let mut tail = [0u8; 8];
        head.copy_from_slice(&bytes[..8]);
        tail.copy_from_slice(&bytes[8..]);
        Ok(Self {
            head: i64::from_be_bytes(head),
            tail: i64::from_be_bytes(tail),
        })
    }
}

/// Root record holding the list meta
pub fn lmeta_key(key: &TableKey<'_>) -> Vec<u8> {
    encode_root(tag::LMETA, key)
}

pub fn encode_list_item(key: &TableKey<'_>, seq: i64) -> Vec<u8> {
    encode_sub(tag::LIST, key, &encode_sortable_i64(seq))
}

/// Extract the sequence number from an element key
pub fn decode_list_seq(encoded: &[u8]) -> Result<i64> {
    let decoded = decode_key(encoded)?;
    if decoded.tag != tag::LIST {
        return Err(ShardError::Storage(format!(
            "expected list element key, found tag {:#04x}",
            decoded.tag
        )));
    }
    decode_sortable_i64(decoded.suffix)
}
