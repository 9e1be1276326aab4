//! Daemon configuration model.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Result, StevedoreError};

/// Bridge settings for container network interfaces.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// Name of the virtual switch container interfaces attach to.
    pub virtual_switch_name: String,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            virtual_switch_name: crate::constants::DEFAULT_BRIDGE.into(),
        }
    }
}

/// Root configuration for the Stevedore daemon.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DaemonConfig {
    /// Base directory for image catalog, layers, and container folders.
    pub data_dir: PathBuf,
    /// Storage driver name reported in layer resolution errors.
    pub storage_driver: String,
    /// Network bridge settings.
    pub bridge: BridgeConfig,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            data_dir: crate::constants::data_dir().clone(),
            storage_driver: crate::constants::DEFAULT_STORAGE_DRIVER.into(),
            bridge: BridgeConfig::default(),
        }
    }
}

impl DaemonConfig {
    /// Loads the configuration from a JSON file.
    ///
    /// Fields missing from the file keep their default values.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed, or if the
    /// bridge name is empty.
    pub fn load(path: &Path) -> Result<Self> {
        tracing::debug!(path = %path.display(), "loading daemon configuration");
        let content = std::fs::read_to_string(path).map_err(|e| StevedoreError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        let config: Self = serde_json::from_str(&content)?;
        if config.bridge.virtual_switch_name.is_empty() {
            return Err(StevedoreError::Config {
                message: "bridge.virtual_switch_name must not be empty".into(),
            });
        }
        Ok(config)
    }
}
