//! Configuration types.
//!
//! Every field has a default, so an empty file (or no file at all) yields a
//! working configuration that serves the bundled sample script.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::path::PathBuf;

/// Name under which the bundled demo script is registered.
pub const SAMPLE_SCRIPT: &str = "sample";

/// Server configuration (taskdeck.yaml).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// HTTP listener settings.
    pub api: ApiSettings,
    /// Directory for per-task log files.
    pub logs_dir: PathBuf,
    /// Scripts that may be run, keyed by `script_type`.
    pub scripts: BTreeMap<String, ScriptConfig>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        let mut scripts = BTreeMap::new();
        scripts.insert(
            SAMPLE_SCRIPT.to_string(),
            ScriptConfig {
                path: PathBuf::from("scripts/sample.sh"),
                interpreter: Some("sh".to_string()),
                description: Some("Ten-step demo script".to_string()),
            },
        );
        Self {
            api: ApiSettings::default(),
            logs_dir: PathBuf::from("logs"),
            scripts,
        }
    }
}

/// HTTP listener settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiSettings {
    /// Host to bind to.
    pub host: String,
    /// Port to bind to.
    pub port: u16,
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 5000,
        }
    }
}

impl ApiSettings {
    /// Create settings with custom host and port.
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    /// Get the socket address.
    pub fn socket_addr(&self) -> Result<SocketAddr, std::net::AddrParseError> {
        format!("{}:{}", self.host, self.port).parse()
    }
}

/// One runnable script.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScriptConfig {
    /// Path to the script file.
    pub path: PathBuf,
    /// Program that runs the script, if it is not directly executable.
    #[serde(default)]
    pub interpreter: Option<String>,
    /// Human-readable summary.
    #[serde(default)]
    pub description: Option<String>,
}
