// SPDX-License-Identifier: GPL-3.0-only

//! Reserved-space configuration
//!
//! The file is a small INI document:
//!
//! ```text
//! [STORAGE]
//! CHECK_SIZE=8589934592     # threshold on total capacity, bytes
//! RESERVE=104857600         # reserve when total >= CHECK_SIZE
//! RESERVE_LITE=52428800     # reserve when total < CHECK_SIZE
//! ```

use std::path::{Path, PathBuf};

use configparser::ini::Ini;
use thiserror::Error;
use tracing::debug;

const SECTION: &str = "STORAGE";
const KEY_CHECK_SIZE: &str = "CHECK_SIZE";
const KEY_RESERVE: &str = "RESERVE";
const KEY_RESERVE_LITE: &str = "RESERVE_LITE";

#[derive(Debug, Error)]
pub enum ReserveConfigError {
    #[error("failed to read {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse reserve configuration: {0}")]
    Parse(String),

    #[error("invalid value for {key}: {value:?}")]
    InvalidValue { key: &'static str, value: String },
}

/// Values of the `[STORAGE]` section, all in bytes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StorageReserveConfig {
    pub check_size: Option<u64>,
    pub reserve: Option<u64>,
    pub reserve_lite: Option<u64>,
}

impl StorageReserveConfig {
    pub fn load(path: &Path) -> Result<Self, ReserveConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ReserveConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::parse(&content)?;
        debug!("Loaded reserve configuration from {:?}: {:?}", path, config);
        Ok(config)
    }

    pub fn parse(content: &str) -> Result<Self, ReserveConfigError> {
        let mut conf = Ini::new();
        conf.read(strip_trailing_comments(content))
            .map_err(ReserveConfigError::Parse)?;

        Ok(Self {
            check_size: read_bytes(&conf, KEY_CHECK_SIZE)?,
            reserve: read_bytes(&conf, KEY_RESERVE)?,
            reserve_lite: read_bytes(&conf, KEY_RESERVE_LITE)?,
        })
    }

    /// Reserve applying to a filesystem of `total_bytes`
    ///
    /// Without a positive threshold no reserve applies.
    pub fn reserved_bytes(&self, total_bytes: u64) -> u64 {
        match self.check_size {
            Some(threshold) if threshold > 0 => {
                if total_bytes < threshold {
                    self.reserve_lite.unwrap_or(0)
                } else {
                    self.reserve.unwrap_or(0)
                }
            }
            _ => 0,
        }
    }
}

fn strip_trailing_comments(content: &str) -> String {
    content
        .lines()
        .map(|line| line.split_once('#').map_or(line, |(head, _)| head).trim_end())
        .collect::<Vec<_>>()
        .join("\n")
}

fn read_bytes(conf: &Ini, key: &'static str) -> Result<Option<u64>, ReserveConfigError> {
    let Some(value) = conf.get(SECTION, key) else {
        return Ok(None);
    };

    value
        .trim()
        .parse::<u64>()
        .map(Some)
        .map_err(|_| ReserveConfigError::InvalidValue { key, value })
}
