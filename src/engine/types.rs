//! Engine type definitions.
//!
//! This module contains the engine's error type and the request type used
//! to create tasks.

use std::path::PathBuf;
use thiserror::Error;

use crate::storage::StorageError;

/// Errors returned by the engine's synchronous operations.
///
/// Failures of a task's script are never reported here; they are recorded
/// on the task itself.
#[derive(Debug, Error)]
pub enum EngineError {
    /// No task with the given id exists.
    #[error("task not found: {0}")]
    NotFound(String),

    /// The task is no longer pending or has already been dispatched.
    #[error("task already started: {0}")]
    AlreadyStarted(String),

    /// The task table lock was poisoned.
    #[error("task table lock poisoned")]
    LockPoisoned,

    /// Filesystem error (logs directory or log file access).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Unexpected internal inconsistency.
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<StorageError> for EngineError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound(msg) => EngineError::NotFound(msg),
            StorageError::AlreadyDispatched(msg) => EngineError::AlreadyStarted(msg),
            StorageError::LockPoisoned => EngineError::LockPoisoned,
            StorageError::DuplicateKey(msg) => {
                EngineError::Internal(format!("duplicate key: {}", msg))
            }
        }
    }
}

/// Parameters of a task to create.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTask {
    /// Free-text label for whoever asked for the run.
    pub user_name: String,
    /// Script to execute, already resolved by the caller.
    pub script_path: PathBuf,
    /// Arguments passed verbatim to the script.
    pub args: Vec<String>,
    /// Program that runs the script, if it is not directly executable.
    pub interpreter: Option<String>,
}

impl NewTask {
    /// Describe a run of `script_path` on behalf of `user_name`.
    pub fn new(user_name: impl Into<String>, script_path: impl Into<PathBuf>) -> Self {
        Self {
            user_name: user_name.into(),
            script_path: script_path.into(),
            args: Vec::new(),
            interpreter: None,
        }
    }

    /// Set the script arguments.
    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    /// Run the script through an interpreter.
    pub fn with_interpreter(mut self, interpreter: Option<String>) -> Self {
        self.interpreter = interpreter;
        self
    }
}
