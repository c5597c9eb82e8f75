// SPDX-License-Identifier: GPL-3.0-only

//! Service configuration
//!
//! Every field has a default matching the stock device layout, so an empty
//! document (or no document at all) yields a working configuration.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use storage_sys::settings::RINGTONE_PATH_KEY;
use storage_types::StorageId;
use thiserror::Error;

/// Location read by [`StorageConfig::load_default`]
pub const DEFAULT_CONFIG_PATH: &str = "/etc/storage/storage-info.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid configuration: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InternalStorageConfig {
    pub id: StorageId,

    /// Root of the media directories
    pub root: PathBuf,

    /// Mount point whose statistics describe internal capacity
    pub stat_path: PathBuf,

    /// Reserved-space configuration file
    pub reserve_config: PathBuf,

    /// Settings key holding the current ringtone file
    pub ringtone_key: String,
}

impl Default for InternalStorageConfig {
    fn default() -> Self {
        Self {
            id: StorageId::new(0),
            root: PathBuf::from("/opt/usr/media"),
            stat_path: PathBuf::from("/opt/usr"),
            reserve_config: PathBuf::from("/etc/storage/libstorage.conf"),
            ringtone_key: RINGTONE_PATH_KEY.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RemovableStorageConfig {
    /// Resolve removable media through the system device manager
    pub enabled: bool,
}

impl Default for RemovableStorageConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub internal: InternalStorageConfig,
    pub removable: RemovableStorageConfig,
}

impl StorageConfig {
    /// Load `path`, falling back to defaults when the file does not exist
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(content) => Self::from_toml_str(&content),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!("No configuration at {:?}, using defaults", path);
                Ok(Self::default())
            }
            Err(source) => Err(ConfigError::Io {
                path: path.to_path_buf(),
                source,
            }),
        }
    }

    /// Load the system configuration at [`DEFAULT_CONFIG_PATH`]
    pub fn load_default() -> Result<Self, ConfigError> {
        Self::load(Path::new(DEFAULT_CONFIG_PATH))
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if !self.internal.id.is_valid() {
            return Err(ConfigError::Invalid(format!(
                "internal storage id must not be negative, got {}",
                self.internal.id
            )));
        }
        if !self.internal.root.is_absolute() {
            return Err(ConfigError::Invalid(format!(
                "internal root {:?} is not absolute",
                self.internal.root
            )));
        }
        Ok(())
    }
}
