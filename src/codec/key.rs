//! Shared key layout

use bytes::{Buf, BufMut, BytesMut};

use crate::error::{Result, ShardError};

/// A user key split at its first table delimiter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableKey<'a> {
    /// Bytes before the delimiter (empty when table accounting is off)
    pub table: &'a [u8],
    /// Bytes after the delimiter (the whole key when accounting is off)
    pub rest: &'a [u8],
}

impl<'a> TableKey<'a> {
    /// Split `key` at the first `delimiter`
    ///
    /// With `require_table`, a key without a delimiter or with an empty table
    /// is rejected; without it the whole key becomes `rest`.
    pub fn parse(key: &'a [u8], delimiter: u8, require_table: bool) -> Result<Self> {
        if !require_table {
            return Ok(Self { table: &[], rest: key });
        }

        let pos = key
            .iter()
            .position(|&b| b == delimiter)
            .ok_or_else(|| ShardError::invalid("key has no table prefix"))?;
        if pos == 0 {
            return Err(ShardError::invalid("key has an empty table prefix"));
        }
        if pos > u16::MAX as usize {
            return Err(ShardError::invalid("table name too long"));
        }

        Ok(Self {
            table: &key[..pos],
            rest: &key[pos + 1..],
        })
    }

    fn encoded_len(&self) -> usize {
        1 + 2 + self.table.len() + 4 + self.rest.len()
    }
}

/// The parts of an encoded key
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedKey<'a> {
    pub tag: u8,
    pub table: &'a [u8],
    pub rest: &'a [u8],
    pub suffix: &'a [u8],
}

fn put_head(buf: &mut BytesMut, tag: u8, key: &TableKey<'_>) {
    buf.put_u8(tag);
    buf.put_u16(key.table.len() as u16);
    buf.put_slice(key.table);
    buf.put_u32(key.rest.len() as u32);
    buf.put_slice(key.rest);
}

/// Encode a root record key: `[tag][table][rest]`
pub fn encode_root(tag: u8, key: &TableKey<'_>) -> Vec<u8> {
    encode_sub(tag, key, &[])
}

/// Encode a sub-record key: `[tag][table][rest][suffix]`
pub fn encode_sub(tag: u8, key: &TableKey<'_>, suffix: &[u8]) -> Vec<u8> {
    let mut buf = BytesMut::with_capacity(key.encoded_len() + suffix.len());
    put_head(&mut buf, tag, key);
    buf.put_slice(suffix);
    buf.to_vec()
}

/// Prefix shared by every sub-record of one user key
pub fn sub_prefix(tag: u8, key: &TableKey<'_>) -> Vec<u8> {
    encode_root(tag, key)
}

/// Prefix shared by every record of one type within one table
pub fn table_prefix(tag: u8, table: &[u8]) -> Vec<u8> {
    let mut buf = BytesMut::with_capacity(3 + table.len());
    buf.put_u8(tag);
    buf.put_u16(table.len() as u16);
    buf.put_slice(table);
    buf.to_vec()
}

/// Split an encoded key back into its parts
pub fn decode_key(encoded: &[u8]) -> Result<DecodedKey<'_>> {
    let corrupt = || ShardError::Storage(format!("corrupt key: {:?}", encoded));

    let mut head = encoded;
    if head.remaining() < 3 {
        return Err(corrupt());
    }
    let tag = head.get_u8();
    let table_len = head.get_u16() as usize;
    let table_start = 3;
    let table_end = table_start + table_len;
    if encoded.len() < table_end + 4 {
        return Err(corrupt());
    }

    let mut len_bytes = &encoded[table_end..table_end + 4];
    let rest_len = len_bytes.get_u32() as usize;
    let rest_start = table_end + 4;
    let rest_end = rest_start + rest_len;
    if encoded.len() < rest_end {
        return Err(corrupt());
    }

    Ok(DecodedKey {
        tag,
        table: &encoded[table_start..table_end],
        rest: &encoded[rest_start..rest_end],
        suffix: &encoded[rest_end..],
    })
}
