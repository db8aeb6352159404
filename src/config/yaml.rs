//! YAML configuration parsing.
//!
//! Parses the server configuration from a YAML file or string and validates
//! the values serde cannot check on its own.

use std::path::Path;

use super::error::ConfigError;
use super::types::ServerConfig;

/// Loader for server configuration files.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load server configuration from a file.
    pub fn load(path: impl AsRef<Path>) -> Result<ServerConfig, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::FileReadError {
            path: path.to_path_buf(),
            source,
        })?;
        if content.trim().is_empty() {
            return Ok(ServerConfig::default());
        }
        let config: ServerConfig =
            serde_yaml::from_str(&content).map_err(|source| ConfigError::YamlFileError {
                path: path.to_path_buf(),
                source,
            })?;
        Self::validate(&config)?;
        Ok(config)
    }

    /// Load configuration from `path` if given, else use the defaults.
    pub fn load_or_default(path: Option<&Path>) -> Result<ServerConfig, ConfigError> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(ServerConfig::default()),
        }
    }

    /// Parse server configuration from a YAML string.
    pub fn parse(yaml: &str) -> Result<ServerConfig, ConfigError> {
        // An empty document deserializes as unit, not as a defaulted struct.
        if yaml.trim().is_empty() {
            return Ok(ServerConfig::default());
        }
        let config: ServerConfig = serde_yaml::from_str(yaml)?;
        Self::validate(&config)?;
        Ok(config)
    }

    /// Validate a server configuration.
    pub fn validate(config: &ServerConfig) -> Result<(), ConfigError> {
        if config.api.port == 0 {
            return Err(ConfigError::InvalidConfig("api.port cannot be zero".into()));
        }

        if config.api.host.trim().is_empty() {
            return Err(ConfigError::InvalidConfig("api.host cannot be empty".into()));
        }

        if config.logs_dir.as_os_str().is_empty() {
            return Err(ConfigError::InvalidConfig("logs_dir cannot be empty".into()));
        }

        for (name, script) in &config.scripts {
            if name.trim().is_empty() {
                return Err(ConfigError::InvalidConfig(
                    "script names cannot be empty".into(),
                ));
            }
            if script.path.as_os_str().is_empty() {
                return Err(ConfigError::InvalidConfig(format!(
                    "script '{}' has an empty path",
                    name
                )));
            }
            if script
                .interpreter
                .as_deref()
                .is_some_and(|i| i.trim().is_empty())
            {
                return Err(ConfigError::InvalidConfig(format!(
                    "script '{}' has an empty interpreter",
                    name
                )));
            }
        }

        Ok(())
    }
}
