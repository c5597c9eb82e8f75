// SPDX-License-Identifier: GPL-3.0-only

//! Storage identity, kind, mount state and capacity

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Stable handle naming one internal storage or one removable device
///
/// Negative values are never issued; the device manager uses them as a
/// "no such device" sentinel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StorageId(i32);

impl StorageId {
    pub const fn new(raw: i32) -> Self {
        Self(raw)
    }

    pub const fn get(self) -> i32 {
        self.0
    }

    /// Whether the id can name a storage at all
    pub const fn is_valid(self) -> bool {
        self.0 >= 0
    }
}

impl From<i32> for StorageId {
    fn from(raw: i32) -> Self {
        Self(raw)
    }
}

impl From<StorageId> for i32 {
    fn from(id: StorageId) -> Self {
        id.0
    }
}

impl fmt::Display for StorageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Storage class
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StorageKind {
    /// Built-in, non-removable storage. Always mounted.
    Internal,
    /// Hot-pluggable media (sdcard, USB mass storage)
    External,
}

impl fmt::Display for StorageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageKind::Internal => write!(f, "internal"),
            StorageKind::External => write!(f, "external"),
        }
    }
}

/// Mount state of a storage
///
/// Variants are declared in ascending order so `state >= StorageState::Mounted`
/// reads as "the media has usable capacity".
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
#[repr(i32)]
pub enum StorageState {
    /// Present but cannot be mounted (corrupted or unsupported filesystem)
    Unmountable = -2,
    /// Not present
    Removed = -1,
    /// Present and mounted read/write
    Mounted = 0,
    /// Present and mounted read-only
    MountedReadOnly = 1,
}

impl StorageState {
    pub fn is_mounted(self) -> bool {
        self >= StorageState::Mounted
    }

    pub fn as_raw(self) -> i32 {
        self as i32
    }
}

impl fmt::Display for StorageState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            StorageState::Unmountable => "unmountable",
            StorageState::Removed => "removed",
            StorageState::Mounted => "mounted",
            StorageState::MountedReadOnly => "mounted (read-only)",
        };
        f.write_str(label)
    }
}

/// Capacity figures in bytes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Space {
    pub total: u64,
    pub available: u64,
}

impl Space {
    pub const EMPTY: Space = Space {
        total: 0,
        available: 0,
    };

    pub fn new(total: u64, available: u64) -> Self {
        Self { total, available }
    }
}

/// One entry produced while enumerating storages
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageInfo {
    pub id: StorageId,
    pub kind: StorageKind,
    pub state: StorageState,
    /// Absolute path to the root directory of the storage
    pub root: PathBuf,
}
