//! Core task types.

pub mod task;
pub mod types;
