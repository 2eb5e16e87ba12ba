//! Write batches
//!
//! A batch is the unit of atomicity and visibility: it is logged as one WAL
//! record and applied under one exclusive lock.

use crate::wal::Operation;

/// An ordered list of puts and deletes applied atomically
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WriteBatch {
    ops: Vec<Operation>,
}

impl WriteBatch {
    /// Create an empty batch
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a put
    pub fn put(&mut self, key: impl Into<Vec<u8>>, value: impl Into<Vec<u8>>) {
        self.ops.push(Operation::Put {
            key: key.into(),
            value: value.into(),
        });
    }

    /// Queue a delete
    pub fn delete(&mut self, key: impl Into<Vec<u8>>) {
        self.ops.push(Operation::Delete { key: key.into() });
    }

    /// Number of queued operations
    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// Borrow the queued operations in order
    pub fn operations(&self) -> &[Operation] {
        &self.ops
    }

    /// Consume the batch into its operations
    pub fn into_operations(self) -> Vec<Operation> {
        self.ops
    }
}

impl From<Vec<Operation>> for WriteBatch {
    fn from(ops: Vec<Operation>) -> Self {
        Self { ops }
    }
}
