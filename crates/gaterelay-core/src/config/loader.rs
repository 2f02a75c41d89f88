//! Configuration loading.

use super::RelayConfig;
use crate::error::ConfigError;
use std::fs;
use std::path::{Path, PathBuf};

impl RelayConfig {
    /// Default config file path: `config.json` next to the executable.
    pub fn default_path() -> Result<PathBuf, ConfigError> {
        let exe = std::env::current_exe()?;
        let dir = exe.parent().ok_or_else(|| {
            ConfigError::Validation("Could not determine the executable directory".to_string())
        })?;
        Ok(dir.join("config.json"))
    }

    /// Load and validate configuration from a file path.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path)?;
        let config = Self::parse(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Parse configuration from a JSON string. Does not validate.
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))
    }
}
