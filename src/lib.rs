//! # ShardKV
//!
//! The storage and control-plane core of a partitioned key-value store:
//! - A partition registry: nodes, namespaces, partitions and replica
//!   assignments kept in a coordination service, with epoch-CAS updates,
//!   leader-gated writes and change watches
//! - A redis-style storage engine (strings, hashes, lists, sets, sorted sets)
//!   flattened onto one ordered byte-key space, with per-table key counters
//! - Idempotent apply of replicated log entries
//! - Write-Ahead Logging (WAL) plus checkpoints for durability
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │            Registry  (over a Coordinator service)           │
//! │   nodes · leader election · namespaces · replica epochs     │
//! └─────────────────────────────────────────────────────────────┘
//!
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    Replicated log entries                    │
//! │                 (LogEntry { index, command })                │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │ apply (skips index <= applied)
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │                         Engine                               │
//! │     KV · Hash · List · Set · ZSet  (Single Writer / MR)      │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │ codec: (type, table, key, sub) → bytes
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │                       Substrate                              │
//! │          ordered MemTable + WAL + checkpoint file            │
//! └─────────────────────────────────────────────────────────────┘
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod wal;
pub mod substrate;
pub mod codec;
pub mod engine;
pub mod log;
pub mod registry;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{ErrorKind, Result, ShardError};
pub use config::{Config, RegistryConfig, WalSyncStrategy};
pub use codec::DataType;
pub use engine::{Engine, ScorePair};
pub use log::{Command, LogEntry, Reply};
pub use registry::{Coordinator, MemCoordinator, Registry};

// =============================================================================
// Version Info
// =============================================================================

/// Current version of ShardKV
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
