/*!
Configuration management for the serial link.
*/

use anyhow::{Context, Result};
use feeltech_protocol::wire::{COMMAND_INTERVAL_MS, READ_TIMEOUT_MS};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Main driver configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DriverConfig {
    pub link: LinkConfig,
}

impl DriverConfig {
    /// Create a new configuration with default values
    pub fn new() -> Self {
        Self {
            link: LinkConfig::default(),
        }
    }

    /// Load configuration from a TOML file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        let config: DriverConfig =
            toml::from_str(&content).with_context(|| "Failed to parse config file as TOML")?;

        Ok(config)
    }

    /// Save configuration to a TOML file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content =
            toml::to_string_pretty(self).with_context(|| "Failed to serialize config to TOML")?;

        std::fs::write(path.as_ref(), content)
            .with_context(|| format!("Failed to write config file: {}", path.as_ref().display()))?;

        Ok(())
    }
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Serial link settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinkConfig {
    /// Serial device path, e.g. `/dev/ttyUSB0` or `COM3`
    pub port: String,

    /// Timeout for every blocking read, in milliseconds
    pub read_timeout_ms: u64,

    /// Gap enforced between commands, in milliseconds. Values below the
    /// device minimum of 50 ms are raised to it.
    pub command_interval_ms: u64,
}

impl LinkConfig {
    /// Default settings on the given port
    pub fn new(port: impl Into<String>) -> Self {
        Self {
            port: port.into(),
            ..Self::default()
        }
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }

    pub fn command_interval(&self) -> Duration {
        Duration::from_millis(self.command_interval_ms.max(COMMAND_INTERVAL_MS))
    }
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            port: "/dev/ttyUSB0".to_string(),
            read_timeout_ms: READ_TIMEOUT_MS,
            command_interval_ms: COMMAND_INTERVAL_MS,
        }
    }
}
