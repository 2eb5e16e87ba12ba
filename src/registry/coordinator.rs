//! Coordination service primitives
//!
//! The registry only ever talks to cluster state through this trait: point and
//! prefix reads, puts, version-fenced transactions, prefix watches and leases.
//! Every key carries a creation revision, a modification revision and a
//! per-key version, all drawn from one store-wide revision counter.

use std::time::Duration;

use crossbeam::channel::Receiver;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Lease identifier
pub type LeaseId = i64;

/// A stored key and its revision metadata
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyValue {
    pub key: String,
    pub value: Vec<u8>,
    /// Revision of the put that created the key
    pub create_revision: i64,
    /// Revision of the last put to the key
    pub mod_revision: i64,
    /// Number of puts since creation (1 after the first)
    pub version: i64,
    /// Attached lease, if any
    pub lease: Option<LeaseId>,
}

/// Result of a prefix read, taken at a single revision
#[derive(Debug, Clone, Default)]
pub struct RangeResponse {
    pub kvs: Vec<KeyValue>,
    /// Store revision the read observed
    pub revision: i64,
}

// =============================================================================
// Transactions
// =============================================================================

/// What a compare inspects
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompareTarget {
    Version(i64),
    CreateRevision(i64),
    ModRevision(i64),
    Value(Vec<u8>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareResult {
    Equal,
    NotEqual,
    Greater,
    Less,
}

/// One guard of a transaction
///
/// A missing key has version, create and mod revision 0; a value compare
/// against a missing key always fails.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Compare {
    pub key: String,
    pub result: CompareResult,
    pub target: CompareTarget,
}

impl Compare {
    pub fn version(key: impl Into<String>, result: CompareResult, version: i64) -> Self {
        Self {
            key: key.into(),
            result,
            target: CompareTarget::Version(version),
        }
    }

    pub fn create_revision(key: impl Into<String>, result: CompareResult, revision: i64) -> Self {
        Self {
            key: key.into(),
            result,
            target: CompareTarget::CreateRevision(revision),
        }
    }

    pub fn mod_revision(key: impl Into<String>, result: CompareResult, revision: i64) -> Self {
        Self {
            key: key.into(),
            result,
            target: CompareTarget::ModRevision(revision),
        }
    }

    pub fn value(key: impl Into<String>, result: CompareResult, value: Vec<u8>) -> Self {
        Self {
            key: key.into(),
            result,
            target: CompareTarget::Value(value),
        }
    }

    /// Evaluate against the current state of the key
    pub fn evaluate(&self, current: Option<&KeyValue>) -> bool {
        use std::cmp::Ordering;

        let ordering = match (&self.target, current) {
            (CompareTarget::Value(_), None) => return false,
            (CompareTarget::Value(expected), Some(kv)) => kv.value.as_slice().cmp(expected.as_slice()),
            (CompareTarget::Version(expected), kv) => kv.map_or(0, |kv| kv.version).cmp(expected),
            (CompareTarget::CreateRevision(expected), kv) => {
                kv.map_or(0, |kv| kv.create_revision).cmp(expected)
            }
            (CompareTarget::ModRevision(expected), kv) => {
                kv.map_or(0, |kv| kv.mod_revision).cmp(expected)
            }
        };

        match self.result {
            CompareResult::Equal => ordering == Ordering::Equal,
            CompareResult::NotEqual => ordering != Ordering::Equal,
            CompareResult::Greater => ordering == Ordering::Greater,
            CompareResult::Less => ordering == Ordering::Less,
        }
    }
}

/// A write inside a transaction
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TxnOp {
    Put {
        key: String,
        value: Vec<u8>,
        lease: Option<LeaseId>,
    },
    Delete {
        key: String,
    },
    DeletePrefix {
        prefix: String,
    },
}

/// All compares must hold for the writes to apply, atomically, at one revision
#[derive(Debug, Clone, Default)]
pub struct Txn {
    pub compares: Vec<Compare>,
    pub success: Vec<TxnOp>,
}

impl Txn {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a guard
    pub fn when(mut self, compare: Compare) -> Self {
        self.compares.push(compare);
        self
    }

    /// Add a write
    pub fn then(mut self, op: TxnOp) -> Self {
        self.success.push(op);
        self
    }

    pub fn put(self, key: impl Into<String>, value: Vec<u8>, lease: Option<LeaseId>) -> Self {
        self.then(TxnOp::Put {
            key: key.into(),
            value,
            lease,
        })
    }

    pub fn delete(self, key: impl Into<String>) -> Self {
        self.then(TxnOp::Delete { key: key.into() })
    }

    pub fn delete_prefix(self, prefix: impl Into<String>) -> Self {
        self.then(TxnOp::DeletePrefix {
            prefix: prefix.into(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxnResponse {
    pub succeeded: bool,
    /// Index of the first compare that failed
    pub failed_compare: Option<usize>,
    /// Store revision after the transaction
    pub revision: i64,
}

// =============================================================================
// Watches
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchEventKind {
    Put,
    Delete,
}

/// One change under a watched prefix
///
/// For deletes `kv.value` is empty and `kv.mod_revision` is the revision of
/// the delete.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchEvent {
    pub kind: WatchEventKind,
    pub kv: KeyValue,
}

// =============================================================================
// The service
// =============================================================================

/// A strongly consistent coordination service
///
/// Every call fails with `Unavailable` while the service is unreachable.
pub trait Coordinator: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<KeyValue>>;

    /// Every key starting with `prefix`, in key order
    fn range(&self, prefix: &str) -> Result<RangeResponse>;

    /// Upsert a key; returns the new store revision
    fn put(&self, key: &str, value: Vec<u8>, lease: Option<LeaseId>) -> Result<i64>;

    /// Delete every key starting with `prefix`; returns how many were deleted
    fn delete_prefix(&self, prefix: &str) -> Result<usize>;

    fn txn(&self, txn: Txn) -> Result<TxnResponse>;

    /// Stream of changes under `prefix`, starting after the current revision
    ///
    /// The channel is unbounded so publishing never blocks writers; it
    /// disconnects when the service shuts down.
    fn watch_prefix(&self, prefix: &str) -> Result<Receiver<WatchEvent>>;

    fn grant_lease(&self, ttl: Duration) -> Result<LeaseId>;

    /// Renew a lease; `NotFound` once it has expired or been revoked
    fn keep_alive(&self, lease: LeaseId) -> Result<()>;

    /// Revoke a lease, deleting every key attached to it
    fn revoke_lease(&self, lease: LeaseId) -> Result<()>;

    fn current_revision(&self) -> Result<i64>;
}
