//! Task execution.
//!
//! This module provides the pieces that run a task's script: launching the
//! child process, mirroring its output to a log file, and supervising it to
//! a terminal state.

mod command;
mod log;
mod supervisor;

pub use command::{ScriptCommand, ScriptCommandBuilder};
pub use log::{TaskLog, log_path, read_log};
pub use supervisor::ExecutionUnit;
