//! MemTable implementation
//!
//! BTreeMap-based ordered table behind a parking_lot RwLock.
//! - Ordered keys (required for range scans and checkpoints)
//! - Many concurrent readers, one exclusive batch writer

use std::collections::BTreeMap;
use std::ops::Bound;
use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::{RwLock, RwLockReadGuard};

use crate::wal::Operation;

use super::WriteBatch;

type Table = BTreeMap<Vec<u8>, Vec<u8>>;

/// In-memory ordered key space
pub struct MemTable {
    data: RwLock<Table>,

    /// Approximate size in bytes (keys + values)
    size: AtomicUsize,
}

impl MemTable {
    /// Create a new empty MemTable
    pub fn new() -> Self {
        Self::from_map(BTreeMap::new())
    }

    /// Wrap an already loaded map (checkpoint recovery)
    pub fn from_map(map: Table) -> Self {
        let size = map.iter().map(|(k, v)| k.len() + v.len()).sum();
        Self {
            data: RwLock::new(map),
            size: AtomicUsize::new(size),
        }
    }

    /// Get a copy of the value for a key
    pub fn get(&self, key: &[u8]) -> Option<Vec<u8>> {
        self.data.read().get(key).cloned()
    }

    /// Apply every operation of a batch under one write lock
    ///
    /// Returns the new approximate size.
    pub fn apply(&self, batch: &WriteBatch) -> usize {
        self.apply_operations(batch.operations())
    }

    pub(crate) fn apply_operations(&self, ops: &[Operation]) -> usize {
        let mut data = self.data.write();
        let mut size = self.size.load(Ordering::Relaxed) as isize;

        for op in ops {
            match op {
                Operation::Put { key, value } => {
                    size += (key.len() + value.len()) as isize;
                    if let Some(old) = data.insert(key.clone(), value.clone()) {
                        size -= (key.len() + old.len()) as isize;
                    }
                }
                Operation::Delete { key } => {
                    if let Some(old) = data.remove(key) {
                        size -= (key.len() + old.len()) as isize;
                    }
                }
            }
        }

        let size = size.max(0) as usize;
        self.size.store(size, Ordering::Relaxed);
        size
    }

    /// Take a consistent read view; writers wait until it is dropped
    pub fn view(&self) -> View<'_> {
        View {
            data: self.data.read(),
        }
    }

    /// Get approximate size in bytes
    pub fn size(&self) -> usize {
        self.size.load(Ordering::Relaxed)
    }

    /// Get entry count
    pub fn entry_count(&self) -> usize {
        self.data.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.read().is_empty()
    }
}

impl Default for MemTable {
    fn default() -> Self {
        Self::new()
    }
}

/// A point-in-time read view over the table
///
/// All reads through one view observe the same committed state.
pub struct View<'a> {
    data: RwLockReadGuard<'a, Table>,
}

impl<'a> View<'a> {
    /// Borrow the value for a key
    pub fn get(&self, key: &[u8]) -> Option<&[u8]> {
        self.data.get(key).map(|v| v.as_slice())
    }

    /// Iterate keys in `[start, end)` in ascending order; `end = None` is unbounded
    ///
    /// A start past the end yields nothing.
    pub fn range<'b>(
        &'b self,
        start: &[u8],
        end: Option<&[u8]>,
    ) -> impl DoubleEndedIterator<Item = (&'b [u8], &'b [u8])> + 'b {
        let (start, upper) = match end {
            Some(end) if start > end => (end, Bound::Excluded(end)),
            Some(end) => (start, Bound::Excluded(end)),
            None => (start, Bound::Unbounded),
        };
        self.data
            .range::<[u8], _>((Bound::Included(start), upper))
            .map(|(k, v)| (k.as_slice(), v.as_slice()))
    }

    /// Iterate keys in `[start, end)` in descending order
    pub fn range_rev<'b>(
        &'b self,
        start: &[u8],
        end: Option<&[u8]>,
    ) -> impl Iterator<Item = (&'b [u8], &'b [u8])> + 'b {
        self.range(start, end).rev()
    }

    /// Iterate all keys starting with `prefix` in ascending order
    pub fn prefix<'b>(
        &'b self,
        prefix: &[u8],
    ) -> impl DoubleEndedIterator<Item = (&'b [u8], &'b [u8])> + 'b {
        let end = super::prefix_end(prefix);
        let start = prefix.to_vec();
        let upper = match end {
            Some(end) => Bound::Excluded(end),
            None => Bound::Unbounded,
        };
        self.data
            .range::<Vec<u8>, _>((Bound::Included(start), upper))
            .map(|(k, v)| (k.as_slice(), v.as_slice()))
    }

    /// Iterate every entry in key order (checkpoint writer)
    pub fn iter(&self) -> impl Iterator<Item = (&[u8], &[u8])> {
        self.data.iter().map(|(k, v)| (k.as_slice(), v.as_slice()))
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}
