//! Script catalog.
//!
//! Clients never send paths; they name a `script_type`, and the catalog
//! resolves it to a script on disk. Resolution is where request validation
//! happens: an unknown name is the caller's mistake, a known name whose file
//! has disappeared is a missing resource.

use std::collections::BTreeMap;
use std::path::PathBuf;
use thiserror::Error;

use crate::config::{SAMPLE_SCRIPT, ScriptConfig, ServerConfig};

/// Errors that can occur when resolving a script.
#[derive(Debug, Error)]
pub enum ScriptError {
    /// No script is registered under the requested name.
    #[error("unknown script type: {0}")]
    UnknownScript(String),

    /// The script is registered but its file does not exist.
    #[error("script not found: {0}")]
    ScriptMissing(String),
}

/// A resolved, runnable script.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptEntry {
    /// Registered name.
    pub name: String,
    /// Absolute path of the script.
    pub path: PathBuf,
    /// Program that runs the script, if any.
    pub interpreter: Option<String>,
    /// Human-readable summary.
    pub description: Option<String>,
}

/// Registry of scripts that may be run, keyed by `script_type`.
#[derive(Debug, Clone, Default)]
pub struct ScriptCatalog {
    scripts: BTreeMap<String, ScriptConfig>,
}

impl ScriptCatalog {
    /// Create an empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the catalog from server configuration.
    pub fn from_config(config: &ServerConfig) -> Self {
        Self {
            scripts: config.scripts.clone(),
        }
    }

    /// Register a script under `name`, replacing any previous entry.
    pub fn with_script(mut self, name: impl Into<String>, script: ScriptConfig) -> Self {
        self.scripts.insert(name.into(), script);
        self
    }

    /// The `script_type` used when a request names none.
    pub fn default_script_type() -> &'static str {
        SAMPLE_SCRIPT
    }

    /// Registered script names, sorted.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.scripts.keys().map(String::as_str)
    }

    /// Description of a registered script, if it has one.
    pub fn describe(&self, name: &str) -> Option<&str> {
        self.scripts
            .get(name)
            .and_then(|script| script.description.as_deref())
    }

    /// Number of registered scripts.
    pub fn len(&self) -> usize {
        self.scripts.len()
    }

    /// Whether no scripts are registered.
    pub fn is_empty(&self) -> bool {
        self.scripts.is_empty()
    }

    /// Resolve a `script_type` to a script that exists on disk.
    pub fn resolve(&self, script_type: &str) -> Result<ScriptEntry, ScriptError> {
        let script = self
            .scripts
            .get(script_type)
            .ok_or_else(|| ScriptError::UnknownScript(script_type.to_string()))?;

        if !script.path.is_file() {
            return Err(ScriptError::ScriptMissing(format!(
                "{} ({})",
                script_type,
                script.path.display()
            )));
        }

        let path = std::path::absolute(&script.path)
            .map_err(|e| ScriptError::ScriptMissing(format!("{}: {}", script_type, e)))?;

        Ok(ScriptEntry {
            name: script_type.to_string(),
            path,
            interpreter: script.interpreter.clone(),
            description: script.description.clone(),
        })
    }
}
