// SPDX-License-Identifier: GPL-3.0-only

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SettingsError {
    #[error("settings backend unavailable: {0}")]
    Unavailable(String),

    #[error("setting {key} has no usable value: {reason}")]
    InvalidValue { key: String, reason: String },
}

/// User settings consulted by internal storage
pub trait SettingsProvider: Send + Sync {
    /// Absolute path of the current ringtone file
    fn ringtone_path(&self) -> Result<PathBuf, SettingsError>;
}
