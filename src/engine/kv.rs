//! String and bit operations
//!
//! A string is a single `KV` root record holding the raw value bytes. Bit
//! offsets address bits most-significant first within each byte.

use crate::codec::{encode_root, tag, DataType, TableKey};
use crate::error::{Result, ShardError};

use super::txn::{KeyLookup, WriteTxn};
use super::{check_type, ensure_not_empty, parse_int, Engine};

/// Largest value a string may grow to (512 MB)
pub const MAX_VALUE_SIZE: usize = 512 * 1024 * 1024;

const MAX_BIT_OFFSET: u64 = MAX_VALUE_SIZE as u64 * 8 - 1;

fn kv_key(key: &TableKey<'_>) -> Vec<u8> {
    encode_root(tag::KV, key)
}

/// Resolve an inclusive byte range; negative positions count from the end
fn resolve_byte_range(start: i64, end: i64, len: usize) -> Option<(usize, usize)> {
    let len = len as i64;
    if len == 0 {
        return None;
    }
    let start = if start < 0 { start + len } else { start }.max(0);
    let end = if end < 0 { end + len } else { end }.max(0).min(len - 1);
    if start > end {
        return None;
    }
    Some((start as usize, end as usize))
}

fn check_size(len: usize) -> Result<()> {
    if len > MAX_VALUE_SIZE {
        return Err(ShardError::invalid("string exceeds maximum allowed size"));
    }
    Ok(())
}

impl Engine {
    // =========================================================================
    // Reads
    // =========================================================================

    /// Get the value of a string key
    pub fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        let tk = self.table_key(key)?;
        let view = self.view()?;
        check_type(&view, &tk, DataType::String)?;
        Ok(view.lookup(&kv_key(&tk)))
    }

    /// Whether a string key exists
    pub fn exists(&self, key: &[u8]) -> Result<bool> {
        let tk = self.table_key(key)?;
        let view = self.view()?;
        check_type(&view, &tk, DataType::String)?;
        Ok(view.contains(&kv_key(&tk)))
    }

    /// Length of the value (0 when absent)
    pub fn strlen(&self, key: &[u8]) -> Result<i64> {
        Ok(self.get(key)?.map_or(0, |v| v.len() as i64))
    }

    /// Substring between two inclusive byte positions
    pub fn get_range(&self, key: &[u8], start: i64, end: i64) -> Result<Vec<u8>> {
        let value = self.get(key)?.unwrap_or_default();
        Ok(match resolve_byte_range(start, end, value.len()) {
            Some((s, e)) => value[s..=e].to_vec(),
            None => Vec::new(),
        })
    }

    /// Get several keys from one read view
    ///
    /// Each key gets its own result; a bad key never fails its siblings.
    pub fn mget<K: AsRef<[u8]>>(&self, keys: &[K]) -> Result<Vec<Result<Option<Vec<u8>>>>> {
        ensure_not_empty(keys, "keys")?;
        let view = self.view()?;
        Ok(keys
            .iter()
            .map(|key| {
                let tk = self.table_key(key.as_ref())?;
                check_type(&view, &tk, DataType::String)?;
                Ok(view.lookup(&kv_key(&tk)))
            })
            .collect())
    }

    /// Bit at `offset` (0 past the end of the value)
    pub fn get_bit(&self, key: &[u8], offset: u64) -> Result<u8> {
        if offset > MAX_BIT_OFFSET {
            return Err(ShardError::invalid("bit offset is out of range"));
        }
        let value = self.get(key)?.unwrap_or_default();
        let byte = (offset / 8) as usize;
        Ok(match value.get(byte) {
            Some(b) => (b >> (7 - (offset % 8))) & 1,
            None => 0,
        })
    }

    /// Count set bits between two inclusive byte positions
    pub fn bit_count(&self, key: &[u8], start: i64, end: i64) -> Result<i64> {
        let value = self.get(key)?.unwrap_or_default();
        Ok(match resolve_byte_range(start, end, value.len()) {
            Some((s, e)) => value[s..=e].iter().map(|b| b.count_ones() as i64).sum(),
            None => 0,
        })
    }

    // =========================================================================
    // Writes
    // =========================================================================

    pub fn set(&self, key: &[u8], value: &[u8]) -> Result<()> {
        self.write(|txn| self.set_in(txn, key, value))
    }

    /// Set only if absent; returns 1 when set, 0 otherwise
    pub fn set_nx(&self, key: &[u8], value: &[u8]) -> Result<i64> {
        self.write(|txn| self.set_nx_in(txn, key, value))
    }

    /// Set and return the previous value
    pub fn get_set(&self, key: &[u8], value: &[u8]) -> Result<Option<Vec<u8>>> {
        self.write(|txn| self.get_set_in(txn, key, value))
    }

    /// Append to the value, creating it if absent; returns the new length
    pub fn append(&self, key: &[u8], value: &[u8]) -> Result<i64> {
        self.write(|txn| self.append_in(txn, key, value))
    }

    /// Overwrite part of the value at `offset`, zero-padding any gap
    ///
    /// Returns the new length.
    pub fn set_range(&self, key: &[u8], offset: i64, value: &[u8]) -> Result<i64> {
        self.write(|txn| self.set_range_in(txn, key, offset, value))
    }

    /// Delete one string key; returns whether it existed
    pub fn delete(&self, key: &[u8]) -> Result<bool> {
        self.write(|txn| self.delete_in(txn, key))
    }

    /// Delete several string keys; returns how many existed
    ///
    /// Keys that are malformed or hold another type are skipped.
    pub fn del<K: AsRef<[u8]>>(&self, keys: &[K]) -> Result<i64> {
        self.write(|txn| self.del_in(txn, keys))
    }

    /// Set several keys in one batch; one result per pair, in order
    pub fn mset<K, V>(&self, pairs: &[(K, V)]) -> Result<Vec<Result<()>>>
    where
        K: AsRef<[u8]>,
        V: AsRef<[u8]>,
    {
        self.write(|txn| self.mset_in(txn, pairs))
    }

    pub fn incr(&self, key: &[u8]) -> Result<i64> {
        self.incr_by(key, 1)
    }

    pub fn decr(&self, key: &[u8]) -> Result<i64> {
        self.incr_by(key, -1)
    }

    /// Add `delta` to an integer value (absent = 0); returns the new value
    pub fn incr_by(&self, key: &[u8], delta: i64) -> Result<i64> {
        self.write(|txn| self.incr_by_in(txn, key, delta))
    }

    /// Set or clear one bit, growing the value as needed; returns the prior bit
    pub fn set_bit(&self, key: &[u8], offset: u64, on: bool) -> Result<u8> {
        self.write(|txn| self.set_bit_in(txn, key, offset, on))
    }

    // =========================================================================
    // Staged implementations (shared with log apply)
    // =========================================================================

    /// Current value of a string key inside a write
    fn load_string(&self, txn: &WriteTxn<'_>, tk: &TableKey<'_>) -> Result<Option<Vec<u8>>> {
        check_type(txn, tk, DataType::String)?;
        Ok(txn.lookup(&kv_key(tk)))
    }

    pub(super) fn set_in(&self, txn: &mut WriteTxn<'_>, key: &[u8], value: &[u8]) -> Result<()> {
        let tk = self.table_key(key)?;
        check_type(txn, &tk, DataType::String)?;
        check_size(value.len())?;
        txn.put_root(tk.table, kv_key(&tk), value.to_vec());
        Ok(())
    }

    pub(super) fn set_nx_in(&self, txn: &mut WriteTxn<'_>, key: &[u8], value: &[u8]) -> Result<i64> {
        let tk = self.table_key(key)?;
        if self.load_string(txn, &tk)?.is_some() {
            return Ok(0);
        }
        check_size(value.len())?;
        txn.put_root(tk.table, kv_key(&tk), value.to_vec());
        Ok(1)
    }

    pub(super) fn get_set_in(
        &self,
        txn: &mut WriteTxn<'_>,
        key: &[u8],
        value: &[u8],
    ) -> Result<Option<Vec<u8>>> {
        let tk = self.table_key(key)?;
        let old = self.load_string(txn, &tk)?;
        check_size(value.len())?;
        txn.put_root(tk.table, kv_key(&tk), value.to_vec());
        Ok(old)
    }

    pub(super) fn append_in(&self, txn: &mut WriteTxn<'_>, key: &[u8], value: &[u8]) -> Result<i64> {
        let tk = self.table_key(key)?;
        let mut current = self.load_string(txn, &tk)?.unwrap_or_default();
        check_size(current.len() + value.len())?;
        current.extend_from_slice(value);
        let len = current.len() as i64;
        txn.put_root(tk.table, kv_key(&tk), current);
        Ok(len)
    }

    pub(super) fn set_range_in(
        &self,
        txn: &mut WriteTxn<'_>,
        key: &[u8],
        offset: i64,
        value: &[u8],
    ) -> Result<i64> {
        if offset < 0 {
            return Err(ShardError::invalid("offset is out of range"));
        }
        let tk = self.table_key(key)?;
        let mut current = self.load_string(txn, &tk)?.unwrap_or_default();
        if value.is_empty() {
            return Ok(current.len() as i64);
        }

        let offset = offset as usize;
        let end = offset + value.len();
        check_size(end)?;
        if current.len() < end {
            current.resize(end, 0);
        }
        current[offset..end].copy_from_slice(value);

        let len = current.len() as i64;
        txn.put_root(tk.table, kv_key(&tk), current);
        Ok(len)
    }

    pub(super) fn delete_in(&self, txn: &mut WriteTxn<'_>, key: &[u8]) -> Result<bool> {
        let tk = self.table_key(key)?;
        check_type(txn, &tk, DataType::String)?;
        Ok(txn.delete_root(tk.table, kv_key(&tk)))
    }

    pub(super) fn del_in<K: AsRef<[u8]>>(&self, txn: &mut WriteTxn<'_>, keys: &[K]) -> Result<i64> {
        ensure_not_empty(keys, "keys")?;
        let mut removed = 0;
        for key in keys {
            match self.delete_in(txn, key.as_ref()) {
                Ok(true) => removed += 1,
                Ok(false) => {}
                Err(e) => tracing::debug!(error = %e, "skipping key in multi-key delete"),
            }
        }
        Ok(removed)
    }

    pub(super) fn mset_in<K, V>(&self, txn: &mut WriteTxn<'_>, pairs: &[(K, V)]) -> Result<Vec<Result<()>>>
    where
        K: AsRef<[u8]>,
        V: AsRef<[u8]>,
    {
        ensure_not_empty(pairs, "key-value pairs")?;
        Ok(pairs
            .iter()
            .map(|(key, value)| self.set_in(txn, key.as_ref(), value.as_ref()))
            .collect())
    }

    pub(super) fn incr_by_in(&self, txn: &mut WriteTxn<'_>, key: &[u8], delta: i64) -> Result<i64> {
        let tk = self.table_key(key)?;
        let current = match self.load_string(txn, &tk)? {
            Some(raw) => parse_int(&raw)?,
            None => 0,
        };
        let next = current
            .checked_add(delta)
            .ok_or_else(|| ShardError::invalid("increment or decrement would overflow"))?;
        txn.put_root(tk.table, kv_key(&tk), next.to_string().into_bytes());
        Ok(next)
    }

    pub(super) fn set_bit_in(
        &self,
        txn: &mut WriteTxn<'_>,
        key: &[u8],
        offset: u64,
        on: bool,
    ) -> Result<u8> {
        if offset > MAX_BIT_OFFSET {
            return Err(ShardError::invalid("bit offset is out of range"));
        }
        let tk = self.table_key(key)?;
        let mut value = self.load_string(txn, &tk)?.unwrap_or_default();

        let byte = (offset / 8) as usize;
        let shift = 7 - (offset % 8) as u32;
        if value.len() <= byte {
            value.resize(byte + 1, 0);
        }
        let prior = (value[byte] >> shift) & 1;
        if on {
            value[byte] |= 1 << shift;
        } else {
            value[byte] &= !(1 << shift);
        }

        txn.put_root(tk.table, kv_key(&tk), value);
        Ok(prior)
    }
}
