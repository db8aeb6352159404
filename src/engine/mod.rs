//! Task engine.
//!
//! This module ties the task table, the execution units and the event bus
//! together behind the five operations callers use: create, execute, get,
//! list and logs.

mod task_engine;
mod types;

pub use task_engine::TaskEngine;
pub use types::{EngineError, NewTask};
