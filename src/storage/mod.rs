//! Task table.
//!
//! All task records live in one [`TaskTable`] guarded by a single lock, so
//! every mutation of a record is visible to readers all at once. Records are
//! never removed; the table grows for the life of the process.

mod memory;

pub use memory::TaskTable;

use thiserror::Error;

/// Errors that can occur during table operations.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The requested task was not found.
    #[error("not found: {0}")]
    NotFound(String),

    /// A task with the same id already exists.
    #[error("duplicate key: {0}")]
    DuplicateKey(String),

    /// The task can no longer be dispatched for execution.
    #[error("already dispatched: {0}")]
    AlreadyDispatched(String),

    /// Table lock was poisoned.
    #[error("storage lock poisoned")]
    LockPoisoned,
}
