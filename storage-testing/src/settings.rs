// SPDX-License-Identifier: GPL-3.0-only

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use storage_contracts::{SettingsError, SettingsProvider};

/// Settings provider answering from a fixed value
#[derive(Debug, Clone)]
pub struct FakeSettings {
    ringtone: Arc<Mutex<Result<PathBuf, SettingsError>>>,
}

impl FakeSettings {
    pub fn with_ringtone(path: impl Into<PathBuf>) -> Self {
        Self {
            ringtone: Arc::new(Mutex::new(Ok(path.into()))),
        }
    }

    /// A provider whose every lookup fails
    pub fn unavailable() -> Self {
        Self {
            ringtone: Arc::new(Mutex::new(Err(SettingsError::Unavailable(
                "settings daemon not running".to_string(),
            )))),
        }
    }

    pub fn set_ringtone(&self, path: impl Into<PathBuf>) {
        *self.ringtone.lock().unwrap_or_else(|p| p.into_inner()) = Ok(path.into());
    }
}

impl SettingsProvider for FakeSettings {
    fn ringtone_path(&self) -> Result<PathBuf, SettingsError> {
        self.ringtone
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .clone()
    }
}
