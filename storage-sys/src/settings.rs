// SPDX-License-Identifier: GPL-3.0-only

//! User settings lookups through the `vconftool` CLI

use std::path::PathBuf;
use std::process::Command;

use storage_contracts::{SettingsError, SettingsProvider};
use tracing::{debug, warn};
use which::which;

use crate::error::{Result, SysError};

/// Settings key holding the current call ringtone
pub const RINGTONE_PATH_KEY: &str = "db/setting/sound/call/ringtone_path";

/// [`SettingsProvider`] reading the settings database with `vconftool get`
///
/// The binary is looked up on every call so a registry can be assembled on
/// systems without the tool; only ringtone lookups fail there.
#[derive(Debug, Clone)]
pub struct VconfSettings {
    ringtone_key: String,
}

impl VconfSettings {
    pub fn new(ringtone_key: impl Into<String>) -> Self {
        Self {
            ringtone_key: ringtone_key.into(),
        }
    }

    /// Read one string key
    pub fn get_string(&self, key: &str) -> Result<String> {
        let binary = which("vconftool").map_err(|_| SysError::ToolNotFound("vconftool"))?;

        debug!("Reading setting {} with {:?}", key, binary);
        let output = Command::new(&binary)
            .arg("get")
            .arg(key)
            .output()?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            warn!("vconftool get {} failed: {}", key, stderr);
            return Err(SysError::OperationFailed(format!(
                "vconftool get {key} failed: {}",
                stderr.trim()
            )));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        parse_string_value(&stdout).ok_or_else(|| {
            SysError::OperationFailed(format!("unexpected vconftool output: {}", stdout.trim()))
        })
    }
}

impl Default for VconfSettings {
    fn default() -> Self {
        Self::new(RINGTONE_PATH_KEY)
    }
}

impl SettingsProvider for VconfSettings {
    fn ringtone_path(&self) -> std::result::Result<PathBuf, SettingsError> {
        let value = self.get_string(&self.ringtone_key).map_err(|e| match e {
            SysError::ToolNotFound(_) => SettingsError::Unavailable(e.to_string()),
            other => SettingsError::InvalidValue {
                key: self.ringtone_key.clone(),
                reason: other.to_string(),
            },
        })?;

        if value.is_empty() {
            return Err(SettingsError::InvalidValue {
                key: self.ringtone_key.clone(),
                reason: "empty value".to_string(),
            });
        }
        Ok(PathBuf::from(value))
    }
}

/// Extract the value from `"<key>, value = <value> (string)"`
fn parse_string_value(output: &str) -> Option<String> {
    let line = output.lines().find(|line| line.contains("value = "))?;
    let (_, value) = line.split_once("value = ")?;
    let value = value.trim_end();
    let value = value.strip_suffix("(string)").unwrap_or(value);
    Some(value.trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::parse_string_value;

    #[test]
    fn parses_string_setting_output() {
        let output = "db/setting/sound/call/ringtone_path, value = /opt/usr/share/settings/Ringtones/ringtone_sdk.mp3 (string)\n";
        assert_eq!(
            parse_string_value(output).as_deref(),
            Some("/opt/usr/share/settings/Ringtones/ringtone_sdk.mp3")
        );
    }

    #[test]
    fn rejects_output_without_value() {
        assert_eq!(parse_string_value("key not found\n"), None);
    }
}
