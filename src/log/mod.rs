//! Log Module
//!
//! The model of committed operations handed to a partition's storage engine.
//! Adapters turn client mutations into [`Command`]s, propose them to the
//! consensus log, and apply each committed [`LogEntry`] in order through
//! [`Engine::apply`](crate::engine::Engine::apply).
//!
//! ## Entry Frame
//! ```text
//! ┌─────────────┬──────────┬──────────────────────────────┐
//! │ Version (1) │ Len (4)  │  bincode(LogEntry)           │
//! └─────────────┴──────────┴──────────────────────────────┘
//! ```
//! - `Len` is big-endian and covers the payload only
//! - Entries of an unknown version are rejected, never guessed at

mod codec;
mod command;
mod reply;

pub use codec::{
    decode_entry, encode_entry, read_entry, write_entry, FRAME_VERSION, HEADER_SIZE,
    MAX_ENTRY_SIZE,
};
pub use command::{Command, LogEntry};
pub use reply::Reply;
