//! taskdeck - run scripts as tracked background tasks.
//!
//! A [`TaskEngine`] creates tasks, runs each one's script as a supervised
//! child process, mirrors its output into a per-task log file and serves
//! consistent snapshots to any number of pollers. The [`api`] module exposes
//! the engine over HTTP.

pub mod api;
pub mod config;
pub mod core;
pub mod engine;
pub mod events;
pub mod execution;
pub mod scripts;
pub mod storage;

pub use config::{ApiSettings, ConfigError, ConfigLoader, ScriptConfig, ServerConfig};
pub use core::task::{Task, TaskStatus, running_progress};
pub use core::types::TaskId;
pub use engine::{EngineError, NewTask, TaskEngine};
pub use events::{Event, EventBus, EventHandler};
pub use execution::{ScriptCommand, ScriptCommandBuilder};
pub use scripts::{ScriptCatalog, ScriptEntry, ScriptError};
pub use storage::{StorageError, TaskTable};
