//! Hash operations

use crate::codec::{
    decode_hash_field, decode_i64, encode_hash_field, encode_i64, hash_field_prefix, hsize_key,
    DataType, TableKey,
};
use crate::error::{Result, ShardError};
use crate::substrate::View;

use super::txn::{KeyLookup, WriteTxn};
use super::{check_type, ensure_not_empty, parse_int, Engine};

fn read_len<L: KeyLookup>(src: &L, tk: &TableKey<'_>) -> Result<i64> {
    match src.lookup(&hsize_key(tk)) {
        Some(raw) => decode_i64(&raw),
        None => Ok(0),
    }
}

/// Store a new field count; an empty hash loses its root record
fn write_len(txn: &mut WriteTxn<'_>, tk: &TableKey<'_>, len: i64) {
    if len > 0 {
        txn.put_root(tk.table, hsize_key(tk), encode_i64(len).to_vec());
    } else {
        txn.delete_root(tk.table, hsize_key(tk));
    }
}

impl Engine {
    fn hash_view(&self, key: &[u8]) -> Result<(View<'_>, Vec<u8>)> {
        let tk = self.table_key(key)?;
        let view = self.view()?;
        check_type(&view, &tk, DataType::Hash)?;
        Ok((view, hash_field_prefix(&tk)))
    }

    // =========================================================================
    // Reads
    // =========================================================================

    pub fn hget(&self, key: &[u8], field: &[u8]) -> Result<Option<Vec<u8>>> {
        let tk = self.table_key(key)?;
        let view = self.view()?;
        check_type(&view, &tk, DataType::Hash)?;
        Ok(view.lookup(&encode_hash_field(&tk, field)))
    }

    pub fn hexists(&self, key: &[u8], field: &[u8]) -> Result<bool> {
        Ok(self.hget(key, field)?.is_some())
    }

    /// Number of fields
    pub fn hlen(&self, key: &[u8]) -> Result<i64> {
        let tk = self.table_key(key)?;
        let view = self.view()?;
        check_type(&view, &tk, DataType::Hash)?;
        read_len(&view, &tk)
    }

    /// Values of several fields, in input order (`None` for missing fields)
    pub fn hmget<F: AsRef<[u8]>>(&self, key: &[u8], fields: &[F]) -> Result<Vec<Option<Vec<u8>>>> {
        ensure_not_empty(fields, "fields")?;
        let tk = self.table_key(key)?;
        let view = self.view()?;
        check_type(&view, &tk, DataType::Hash)?;
        Ok(fields
            .iter()
            .map(|f| view.lookup(&encode_hash_field(&tk, f.as_ref())))
            .collect())
    }

    /// All (field, value) pairs in field byte order
    pub fn hgetall(&self, key: &[u8]) -> Result<Vec<(Vec<u8>, Vec<u8>)>> {
        let (view, prefix) = self.hash_view(key)?;
        let pairs = view
            .prefix(&prefix)
            .map(|(k, v)| Ok((decode_hash_field(k)?.to_vec(), v.to_vec())))
            .collect::<Result<Vec<_>>>();
        pairs
    }

    pub fn hkeys(&self, key: &[u8]) -> Result<Vec<Vec<u8>>> {
        let (view, prefix) = self.hash_view(key)?;
        let fields = view
            .prefix(&prefix)
            .map(|(k, _)| Ok(decode_hash_field(k)?.to_vec()))
            .collect::<Result<Vec<_>>>();
        fields
    }

    pub fn hvals(&self, key: &[u8]) -> Result<Vec<Vec<u8>>> {
        let (view, prefix) = self.hash_view(key)?;
        let values: Vec<Vec<u8>> = view.prefix(&prefix).map(|(_, v)| v.to_vec()).collect();
        Ok(values)
    }

    // =========================================================================
    // Writes
    // =========================================================================

    /// Set one field; returns 1 when the field is new, 0 when it was updated
    pub fn hset(&self, key: &[u8], field: &[u8], value: &[u8]) -> Result<i64> {
        self.write(|txn| self.hset_in(txn, key, field, value))
    }

    /// Set several fields at once
    pub fn hmset<F, V>(&self, key: &[u8], pairs: &[(F, V)]) -> Result<()>
    where
        F: AsRef<[u8]>,
        V: AsRef<[u8]>,
    {
        self.write(|txn| self.hmset_in(txn, key, pairs))
    }

    /// Delete fields; returns how many existed
    pub fn hdel<F: AsRef<[u8]>>(&self, key: &[u8], fields: &[F]) -> Result<i64> {
        self.write(|txn| self.hdel_in(txn, key, fields))
    }

    /// Add `delta` to an integer field (absent = 0); returns the new value
    pub fn hincr_by(&self, key: &[u8], field: &[u8], delta: i64) -> Result<i64> {
        self.write(|txn| self.hincr_by_in(txn, key, field, delta))
    }

    /// Remove the whole hash; returns the number of fields removed
    pub fn hclear(&self, key: &[u8]) -> Result<i64> {
        self.write(|txn| self.hclear_in(txn, key))
    }

    /// Remove several hashes; returns how many existed
    pub fn hmclear<K: AsRef<[u8]>>(&self, keys: &[K]) -> Result<i64> {
        self.write(|txn| self.hmclear_in(txn, keys))
    }

    // =========================================================================
    // Staged implementations
    // =========================================================================

    /// Stage one field write; returns whether the field is new
    fn put_field(&self, txn: &mut WriteTxn<'_>, tk: &TableKey<'_>, field: &[u8], value: &[u8]) -> bool {
        let field_key = encode_hash_field(tk, field);
        let is_new = !txn.contains(&field_key);
        txn.put(field_key, value.to_vec());
        is_new
    }

    pub(super) fn hset_in(
        &self,
        txn: &mut WriteTxn<'_>,
        key: &[u8],
        field: &[u8],
        value: &[u8],
    ) -> Result<i64> {
        let tk = self.table_key(key)?;
        check_type(txn, &tk, DataType::Hash)?;
        let len = read_len(txn, &tk)?;
        if self.put_field(txn, &tk, field, value) {
            write_len(txn, &tk, len + 1);
            Ok(1)
        } else {
            Ok(0)
        }
    }

    pub(super) fn hmset_in<F, V>(&self, txn: &mut WriteTxn<'_>, key: &[u8], pairs: &[(F, V)]) -> Result<()>
    where
        F: AsRef<[u8]>,
        V: AsRef<[u8]>,
    {
        ensure_not_empty(pairs, "field-value pairs")?;
        let tk = self.table_key(key)?;
        check_type(txn, &tk, DataType::Hash)?;

        let mut len = read_len(txn, &tk)?;
        for (field, value) in pairs {
            if self.put_field(txn, &tk, field.as_ref(), value.as_ref()) {
                len += 1;
            }
        }
        write_len(txn, &tk, len);
        Ok(())
    }

    pub(super) fn hdel_in<F: AsRef<[u8]>>(&self, txn: &mut WriteTxn<'_>, key: &[u8], fields: &[F]) -> Result<i64> {
        ensure_not_empty(fields, "fields")?;
        let tk = self.table_key(key)?;
        check_type(txn, &tk, DataType::Hash)?;

        let mut removed = 0;
        for field in fields {
            let field_key = encode_hash_field(&tk, field.as_ref());
            if txn.contains(&field_key) {
                txn.delete(field_key);
                removed += 1;
            }
        }
        if removed > 0 {
            let len = read_len(txn, &tk)?;
            write_len(txn, &tk, len - removed);
        }
        Ok(removed)
    }

    pub(super) fn hincr_by_in(
        &self,
        txn: &mut WriteTxn<'_>,
        key: &[u8],
        field: &[u8],
        delta: i64,
    ) -> Result<i64> {
        let tk = self.table_key(key)?;
        check_type(txn, &tk, DataType::Hash)?;

        let current = match txn.lookup(&encode_hash_field(&tk, field)) {
            Some(raw) => parse_int(&raw)?,
            None => 0,
        };
        let next = current
            .checked_add(delta)
            .ok_or_else(|| ShardError::invalid("increment or decrement would overflow"))?;

        let len = read_len(txn, &tk)?;
        if self.put_field(txn, &tk, field, next.to_string().as_bytes()) {
            write_len(txn, &tk, len + 1);
        }
        Ok(next)
    }

    pub(super) fn hclear_in(&self, txn: &mut WriteTxn<'_>, key: &[u8]) -> Result<i64> {
        let tk = self.table_key(key)?;
        check_type(txn, &tk, DataType::Hash)?;

        let fields = txn.scan_prefix(&hash_field_prefix(&tk));
        let removed = fields.len() as i64;
        for (field_key, _) in fields {
            txn.delete(field_key);
        }
        txn.delete_root(tk.table, hsize_key(&tk));
        Ok(removed)
    }

    pub(super) fn hmclear_in<K: AsRef<[u8]>>(&self, txn: &mut WriteTxn<'_>, keys: &[K]) -> Result<i64> {
        ensure_not_empty(keys, "keys")?;
        let mut cleared = 0;
        for key in keys {
            if self.hclear_in(txn, key.as_ref())? > 0 {
                cleared += 1;
            }
        }
        Ok(cleared)
    }
}
