//! List operations
//!
//! A list is its `LMETA` root (head and tail sequence numbers) plus one
//! `LIST` record per element at sequence `head..tail`. Pops and trims move
//! the ends; the root is removed when the list becomes empty.

use crate::codec::{encode_list_item, lmeta_key, DataType, ListMeta, TableKey};
use crate::error::{Result, ShardError};

use super::txn::{KeyLookup, WriteTxn};
use super::{check_type, ensure_not_empty, resolve_index, resolve_rank_range, Engine};

fn load_meta<L: KeyLookup>(src: &L, tk: &TableKey<'_>) -> Result<Option<ListMeta>> {
    src.lookup(&lmeta_key(tk))
        .map(|raw| ListMeta::decode(&raw))
        .transpose()
}

fn store_meta(txn: &mut WriteTxn<'_>, tk: &TableKey<'_>, meta: ListMeta) {
    if meta.is_empty() {
        txn.delete_root(tk.table, lmeta_key(tk));
    } else {
        txn.put_root(tk.table, lmeta_key(tk), meta.encode());
    }
}

#[derive(Clone, Copy)]
enum End {
    Front,
    Back,
}

impl Engine {
    // =========================================================================
    // Reads
    // =========================================================================

    pub fn llen(&self, key: &[u8]) -> Result<i64> {
        let tk = self.table_key(key)?;
        let view = self.view()?;
        check_type(&view, &tk, DataType::List)?;
        Ok(load_meta(&view, &tk)?.map_or(0, |m| m.len()))
    }

    /// Element at `index` (negative counts from the tail); `None` when out of range
    pub fn lindex(&self, key: &[u8], index: i64) -> Result<Option<Vec<u8>>> {
        let tk = self.table_key(key)?;
        let view = self.view()?;
        check_type(&view, &tk, DataType::List)?;

        let Some(meta) = load_meta(&view, &tk)? else {
            return Ok(None);
        };
        Ok(resolve_index(index, meta.len())
            .and_then(|i| view.lookup(&encode_list_item(&tk, meta.head + i))))
    }

    /// Elements between two inclusive positions
    pub fn lrange(&self, key: &[u8], start: i64, stop: i64) -> Result<Vec<Vec<u8>>> {
        let tk = self.table_key(key)?;
        let view = self.view()?;
        check_type(&view, &tk, DataType::List)?;

        let Some(meta) = load_meta(&view, &tk)? else {
            return Ok(Vec::new());
        };
        let Some((start, stop)) = resolve_rank_range(start, stop, meta.len()) else {
            return Ok(Vec::new());
        };

        let from = encode_list_item(&tk, meta.head + start);
        let to = encode_list_item(&tk, meta.head + stop + 1);
        let items: Vec<Vec<u8>> = view.range(&from, Some(to.as_slice())).map(|(_, v)| v.to_vec()).collect();
        Ok(items)
    }

    // =========================================================================
    // Writes
    // =========================================================================

    /// Push values onto the head, one after another; returns the new length
    pub fn lpush<V: AsRef<[u8]>>(&self, key: &[u8], values: &[V]) -> Result<i64> {
        self.write(|txn| self.push_in(txn, key, values, End::Front))
    }

    /// Push values onto the tail; returns the new length
    pub fn rpush<V: AsRef<[u8]>>(&self, key: &[u8], values: &[V]) -> Result<i64> {
        self.write(|txn| self.push_in(txn, key, values, End::Back))
    }

    pub fn lpop(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        self.write(|txn| self.pop_in(txn, key, End::Front))
    }

    pub fn rpop(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        self.write(|txn| self.pop_in(txn, key, End::Back))
    }

    /// Replace the element at `index`
    pub fn lset(&self, key: &[u8], index: i64, value: &[u8]) -> Result<()> {
        self.write(|txn| self.lset_in(txn, key, index, value))
    }

    /// Remove up to `count` elements from the head; returns how many were removed
    pub fn ltrim_front(&self, key: &[u8], count: i64) -> Result<i64> {
        self.write(|txn| self.trim_in(txn, key, count, End::Front))
    }

    /// Remove up to `count` elements from the tail; returns how many were removed
    pub fn ltrim_back(&self, key: &[u8], count: i64) -> Result<i64> {
        self.write(|txn| self.trim_in(txn, key, count, End::Back))
    }

    /// Remove the whole list; returns the number of elements removed
    pub fn lclear(&self, key: &[u8]) -> Result<i64> {
        self.write(|txn| self.lclear_in(txn, key))
    }

    /// Remove several lists; returns how many existed
    pub fn lmclear<K: AsRef<[u8]>>(&self, keys: &[K]) -> Result<i64> {
        self.write(|txn| self.lmclear_in(txn, keys))
    }

    // =========================================================================
    // Staged implementations
    // =========================================================================

    fn list_meta_in(&self, txn: &WriteTxn<'_>, tk: &TableKey<'_>) -> Result<ListMeta> {
        check_type(txn, tk, DataType::List)?;
        Ok(load_meta(txn, tk)?.unwrap_or_else(ListMeta::empty))
    }

    pub(super) fn lpush_in<V: AsRef<[u8]>>(&self, txn: &mut WriteTxn<'_>, key: &[u8], values: &[V]) -> Result<i64> {
        self.push_in(txn, key, values, End::Front)
    }

    pub(super) fn rpush_in<V: AsRef<[u8]>>(&self, txn: &mut WriteTxn<'_>, key: &[u8], values: &[V]) -> Result<i64> {
        self.push_in(txn, key, values, End::Back)
    }

    pub(super) fn lpop_in(&self, txn: &mut WriteTxn<'_>, key: &[u8]) -> Result<Option<Vec<u8>>> {
        self.pop_in(txn, key, End::Front)
    }

    pub(super) fn rpop_in(&self, txn: &mut WriteTxn<'_>, key: &[u8]) -> Result<Option<Vec<u8>>> {
        self.pop_in(txn, key, End::Back)
    }

    pub(super) fn ltrim_front_in(&self, txn: &mut WriteTxn<'_>, key: &[u8], count: i64) -> Result<i64> {
        self.trim_in(txn, key, count, End::Front)
    }

    pub(super) fn ltrim_back_in(&self, txn: &mut WriteTxn<'_>, key: &[u8], count: i64) -> Result<i64> {
        self.trim_in(txn, key, count, End::Back)
    }

    fn push_in<V: AsRef<[u8]>>(
        &self,
        txn: &mut WriteTxn<'_>,
        key: &[u8],
        values: &[V],
        end: End,
    ) -> Result<i64> {
        ensure_not_empty(values, "values")?;
        let tk = self.table_key(key)?;
        let mut meta = self.list_meta_in(txn, &tk)?;

        for value in values {
            let seq = match end {
                End::Front => {
                    meta.head -= 1;
                    meta.head
                }
                End::Back => {
                    meta.tail += 1;
                    meta.tail - 1
                }
            };
            txn.put(encode_list_item(&tk, seq), value.as_ref().to_vec());
        }

        store_meta(txn, &tk, meta);
        Ok(meta.len())
    }

    fn pop_in(&self, txn: &mut WriteTxn<'_>, key: &[u8], end: End) -> Result<Option<Vec<u8>>> {
        let tk = self.table_key(key)?;
        let mut meta = self.list_meta_in(txn, &tk)?;
        if meta.is_empty() {
            return Ok(None);
        }

        let seq = match end {
            End::Front => {
                meta.head += 1;
                meta.head - 1
            }
            End::Back => {
                meta.tail -= 1;
                meta.tail
            }
        };
        let item_key = encode_list_item(&tk, seq);
        let value = txn.lookup(&item_key).ok_or_else(|| {
            ShardError::Storage(format!("list element {} missing below meta", seq))
        })?;
        txn.delete(item_key);

        store_meta(txn, &tk, meta);
        Ok(Some(value))
    }

    pub(super) fn lset_in(&self, txn: &mut WriteTxn<'_>, key: &[u8], index: i64, value: &[u8]) -> Result<()> {
        let tk = self.table_key(key)?;
        check_type(txn, &tk, DataType::List)?;
        let meta = load_meta(txn, &tk)?
            .ok_or_else(|| ShardError::NotFound(String::from_utf8_lossy(key).into_owned()))?;
        let index = resolve_index(index, meta.len())
            .ok_or_else(|| ShardError::invalid("index out of range"))?;

        txn.put(encode_list_item(&tk, meta.head + index), value.to_vec());
        Ok(())
    }

    fn trim_in(&self, txn: &mut WriteTxn<'_>, key: &[u8], count: i64, end: End) -> Result<i64> {
        if count < 0 {
            return Err(ShardError::invalid("trim count must not be negative"));
        }
        let tk = self.table_key(key)?;
        let mut meta = self.list_meta_in(txn, &tk)?;

        let removed = count.min(meta.len());
        for _ in 0..removed {
            let seq = match end {
                End::Front => {
                    meta.head += 1;
                    meta.head - 1
                }
                End::Back => {
                    meta.tail -= 1;
                    meta.tail
                }
            };
            txn.delete(encode_list_item(&tk, seq));
        }

        if removed > 0 {
            store_meta(txn, &tk, meta);
        }
        Ok(removed)
    }

    pub(super) fn lclear_in(&self, txn: &mut WriteTxn<'_>, key: &[u8]) -> Result<i64> {
        let tk = self.table_key(key)?;
        let meta = self.list_meta_in(txn, &tk)?;
        for seq in meta.head..meta.tail {
            txn.delete(encode_list_item(&tk, seq));
        }
        txn.delete_root(tk.table, lmeta_key(&tk));
        Ok(meta.len())
    }

    pub(super) fn lmclear_in<K: AsRef<[u8]>>(&self, txn: &mut WriteTxn<'_>, keys: &[K]) -> Result<i64> {
        ensure_not_empty(keys, "keys")?;
        let mut cleared = 0;
        for key in keys {
            if self.lclear_in(txn, key.as_ref())? > 0 {
                cleared += 1;
            }
        }
        Ok(cleared)
    }
}
