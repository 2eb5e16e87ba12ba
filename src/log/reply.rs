//! Reply definitions
//!
//! The result of applying one committed command.

use crate::error::Result;

/// Outcome of [`Engine::apply`](crate::engine::Engine::apply)
#[derive(Debug)]
pub enum Reply {
    /// Mutation applied, nothing to report
    Ok,

    /// Integer result (counts, lengths, new values, prior bits)
    Int(i64),

    /// Optional value (popped element, previous value)
    Value(Option<Vec<u8>>),

    /// Per-key outcome of a multi-key write, in input order
    Statuses(Vec<Result<()>>),

    /// The entry was at or below the applied index and was skipped
    Duplicate,
}

impl Reply {
    /// Whether the entry was skipped as a redelivery
    pub fn is_duplicate(&self) -> bool {
        matches!(self, Reply::Duplicate)
    }

    /// The integer result, if this is one
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Reply::Int(n) => Some(*n),
            _ => None,
        }
    }
}
