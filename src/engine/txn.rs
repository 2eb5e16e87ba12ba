//! Write transactions
//!
//! Every mutating engine call stages its puts and deletes in a [`WriteTxn`]
//! and commits them as one substrate batch. The overlay gives
//! read-your-writes inside one call (and inside one multi-key call), and the
//! table count deltas land in the same batch as the root records they count.

use std::collections::BTreeMap;
use std::ops::Bound;

use crate::codec::{decode_i64, encode_i64, table_count_key};
use crate::error::Result;
use crate::substrate::{prefix_end, Substrate, View, WriteBatch};

/// Point lookups shared by read views and write transactions
pub(crate) trait KeyLookup {
    fn lookup(&self, key: &[u8]) -> Option<Vec<u8>>;

    fn contains(&self, key: &[u8]) -> bool {
        self.lookup(key).is_some()
    }
}

impl KeyLookup for View<'_> {
    fn lookup(&self, key: &[u8]) -> Option<Vec<u8>> {
        self.get(key).map(|v| v.to_vec())
    }

    fn contains(&self, key: &[u8]) -> bool {
        self.get(key).is_some()
    }
}

/// Staged writes of one engine call
pub(crate) struct WriteTxn<'a> {
    substrate: &'a Substrate,

    /// Staged state: `Some` = put, `None` = delete
    pending: BTreeMap<Vec<u8>, Option<Vec<u8>>>,

    /// Net change of each table's root record count
    table_deltas: BTreeMap<Vec<u8>, i64>,

    count_tables: bool,
}

impl<'a> WriteTxn<'a> {
    pub(crate) fn new(substrate: &'a Substrate, count_tables: bool) -> Self {
        Self {
            substrate,
            pending: BTreeMap::new(),
            table_deltas: BTreeMap::new(),
            count_tables,
        }
    }

    pub(crate) fn put(&mut self, key: Vec<u8>, value: Vec<u8>) {
        self.pending.insert(key, Some(value));
    }

    pub(crate) fn delete(&mut self, key: Vec<u8>) {
        self.pending.insert(key, None);
    }

    /// Put a root record, counting it if it did not exist
    pub(crate) fn put_root(&mut self, table: &[u8], key: Vec<u8>, value: Vec<u8>) {
        if !self.contains(&key) {
            self.bump_table(table, 1);
        }
        self.put(key, value);
    }

    /// Delete a root record; returns whether it existed
    pub(crate) fn delete_root(&mut self, table: &[u8], key: Vec<u8>) -> bool {
        if !self.contains(&key) {
            return false;
        }
        self.bump_table(table, -1);
        self.delete(key);
        true
    }

    fn bump_table(&mut self, table: &[u8], delta: i64) {
        if self.count_tables {
            *self.table_deltas.entry(table.to_vec()).or_insert(0) += delta;
        }
    }

    /// Every live entry under `prefix`, staged writes included, in key order
    pub(crate) fn scan_prefix(&self, prefix: &[u8]) -> Vec<(Vec<u8>, Vec<u8>)> {
        let end = prefix_end(prefix);
        self.scan_range(prefix, end.as_deref())
    }

    /// Every live entry in `[start, end)`, staged writes included, in key order
    pub(crate) fn scan_range(&self, start: &[u8], end: Option<&[u8]>) -> Vec<(Vec<u8>, Vec<u8>)> {
        if end.map_or(false, |end| start >= end) {
            return Vec::new();
        }

        let mut merged: BTreeMap<Vec<u8>, Vec<u8>> = {
            let view = self.substrate.view();
            let stored = view
                .range(start, end)
                .map(|(k, v)| (k.to_vec(), v.to_vec()))
                .collect();
            stored
        };

        for (key, staged) in self.pending.range::<[u8], _>(bounds(start, end)) {
            match staged {
                Some(value) => {
                    merged.insert(key.clone(), value.clone());
                }
                None => {
                    merged.remove(key);
                }
            }
        }
        merged.into_iter().collect()
    }

    /// The first (or with `from_back`, the last) live key under `prefix`,
    /// staged writes included
    pub(crate) fn edge_key(&self, prefix: &[u8], from_back: bool) -> Option<Vec<u8>> {
        let end = prefix_end(prefix);

        let stored = {
            let view = self.substrate.view();
            let mut live = view
                .range(prefix, end.as_deref())
                .filter(|(k, _)| !matches!(self.pending.get(*k), Some(None)));
            let edge = if from_back { live.next_back() } else { live.next() };
            let key = edge.map(|(k, _)| k.to_vec());
            key
        };

        let mut staged = self
            .pending
            .range::<[u8], _>(bounds(prefix, end.as_deref()))
            .filter(|(_, v)| v.is_some())
            .map(|(k, _)| k.clone());
        let staged = if from_back { staged.next_back() } else { staged.next() };

        match (stored, staged) {
            (Some(a), Some(b)) => Some(if from_back { a.max(b) } else { a.min(b) }),
            (a, b) => a.or(b),
        }
    }

    /// Fold staged writes and counter deltas into one batch
    pub(crate) fn into_batch(self) -> Result<WriteBatch> {
        let mut batch = WriteBatch::new();

        for (table, delta) in &self.table_deltas {
            if *delta == 0 {
                continue;
            }
            let key = table_count_key(table);
            let current = match self.substrate.get(&key) {
                Some(raw) => decode_i64(&raw)?,
                None => 0,
            };
            let count = current + delta;
            if count > 0 {
                batch.put(key, encode_i64(count).to_vec());
            } else {
                batch.delete(key);
            }
        }

        for (key, staged) in self.pending {
            match staged {
                Some(value) => batch.put(key, value),
                None => batch.delete(key),
            }
        }
        Ok(batch)
    }
}

fn bounds<'k>(start: &'k [u8], end: Option<&'k [u8]>) -> (Bound<&'k [u8]>, Bound<&'k [u8]>) {
    let upper = match end {
        Some(end) => Bound::Excluded(end),
        None => Bound::Unbounded,
    };
    (Bound::Included(start), upper)
}

impl KeyLookup for WriteTxn<'_> {
    fn lookup(&self, key: &[u8]) -> Option<Vec<u8>> {
        match self.pending.get(key) {
            Some(staged) => staged.clone(),
            None => self.substrate.get(key),
        }
    }
}
