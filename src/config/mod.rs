//! Configuration loading and parsing.
//!
//! This module provides YAML-based configuration for the server: listener
//! address, log directory and the catalog of runnable scripts.

mod error;
mod types;
mod yaml;

pub use error::ConfigError;
pub use types::{ApiSettings, SAMPLE_SCRIPT, ScriptConfig, ServerConfig};
pub use yaml::ConfigLoader;
