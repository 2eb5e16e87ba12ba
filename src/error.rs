//! Error types for shardkv
//!
//! Provides a unified error type for the registry, the storage engine and the
//! substrate beneath it. Callers that need to drive retry logic should match on
//! [`ShardError::kind`] rather than on individual variants.

use thiserror::Error;

/// Result type alias using ShardError
pub type Result<T> = std::result::Result<T, ShardError>;

/// Unified error type for shardkv operations
#[derive(Debug, Error)]
pub enum ShardError {
    // -------------------------------------------------------------------------
    // Model Errors
    // -------------------------------------------------------------------------
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Already exists: {0}")]
    AlreadyExists(String),

    #[error("Epoch conflict: {0}")]
    Conflict(String),

    #[error("Operation against a key holding the wrong kind of value")]
    TypeMismatch,

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    // -------------------------------------------------------------------------
    // Cluster Errors
    // -------------------------------------------------------------------------
    #[error("Registry unavailable: {0}")]
    Unavailable(String),

    #[error("Not the current leader")]
    NotLeader,

    #[error("Engine is closed")]
    Closed,

    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // -------------------------------------------------------------------------
    // WAL / Storage Errors
    // -------------------------------------------------------------------------
    #[error("WAL corruption detected: {0}")]
    WalCorruption(String),

    #[error("Storage error: {0}")]
    Storage(String),

    // -------------------------------------------------------------------------
    // Serialization Errors
    // -------------------------------------------------------------------------
    #[error("Serialization error: {0}")]
    Serialization(String),

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Coarse classification of an error, used by orchestration retry logic
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    AlreadyExists,
    Conflict,
    TypeMismatch,
    InvalidArgument,
    Unavailable,
    NotLeader,
    Closed,
    /// I/O, corruption and encoding failures
    Internal,
}

impl ShardError {
    /// Get the kind of this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            ShardError::NotFound(_) => ErrorKind::NotFound,
            ShardError::AlreadyExists(_) => ErrorKind::AlreadyExists,
            ShardError::Conflict(_) => ErrorKind::Conflict,
            ShardError::TypeMismatch => ErrorKind::TypeMismatch,
            ShardError::InvalidArgument(_) => ErrorKind::InvalidArgument,
            ShardError::Unavailable(_) => ErrorKind::Unavailable,
            ShardError::NotLeader => ErrorKind::NotLeader,
            ShardError::Closed => ErrorKind::Closed,
            ShardError::Io(_)
            | ShardError::WalCorruption(_)
            | ShardError::Storage(_)
            | ShardError::Serialization(_)
            | ShardError::Config(_) => ErrorKind::Internal,
        }
    }

    /// Whether the same call may succeed if retried (after refreshing state)
    pub fn is_retryable(&self) -> bool {
        matches!(self.kind(), ErrorKind::Conflict | ErrorKind::Unavailable)
    }

    /// Whether this is a steady-state outcome of concurrent cluster activity
    /// rather than a genuine failure
    pub fn is_expected(&self) -> bool {
        matches!(self.kind(), ErrorKind::Conflict | ErrorKind::NotLeader)
    }

    pub(crate) fn invalid(msg: impl Into<String>) -> Self {
        ShardError::InvalidArgument(msg.into())
    }
}

impl From<bincode::Error> for ShardError {
    fn from(e: bincode::Error) -> Self {
        ShardError::Serialization(e.to_string())
    }
}
