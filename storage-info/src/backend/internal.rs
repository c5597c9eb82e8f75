// SPDX-License-Identifier: GPL-3.0-only

use std::path::PathBuf;
use std::sync::Arc;

use storage_contracts::{FilesystemStats, SettingsProvider, StorageError};
use storage_sys::CapacityPolicy;
use storage_types::{Space, StorageId, StorageInfo, StorageKind, StorageState};
use tracing::{error, warn};

use super::StorageProvider;

/// Built-in device storage
///
/// Always mounted. Capacity comes from the statistics of `stat_path` with the
/// configured reserve deducted from the available figure.
pub struct InternalBackend {
    id: StorageId,
    root: PathBuf,
    stat_path: PathBuf,
    stats: Arc<dyn FilesystemStats>,
    capacity: CapacityPolicy,
    settings: Arc<dyn SettingsProvider>,
}

impl InternalBackend {
    pub fn new(
        id: StorageId,
        root: impl Into<PathBuf>,
        stat_path: impl Into<PathBuf>,
        stats: Arc<dyn FilesystemStats>,
        capacity: CapacityPolicy,
        settings: Arc<dyn SettingsProvider>,
    ) -> Self {
        Self {
            id,
            root: root.into(),
            stat_path: stat_path.into(),
            stats,
            capacity,
            settings,
        }
    }

    pub fn capacity(&self) -> &CapacityPolicy {
        &self.capacity
    }

    fn check_id(&self, id: StorageId) -> Result<(), StorageError> {
        if id == self.id {
            Ok(())
        } else {
            Err(StorageError::not_supported(format!(
                "storage {id} is not internal storage {}",
                self.id
            )))
        }
    }
}

impl StorageProvider for InternalBackend {
    fn kind(&self) -> StorageKind {
        StorageKind::Internal
    }

    fn fixed_id(&self) -> Option<StorageId> {
        Some(self.id)
    }

    fn list(&self) -> Result<Vec<StorageInfo>, StorageError> {
        Ok(vec![StorageInfo {
            id: self.id,
            kind: StorageKind::Internal,
            state: StorageState::Mounted,
            root: self.root.clone(),
        }])
    }

    fn root(&self, id: StorageId) -> Result<PathBuf, StorageError> {
        self.check_id(id)?;
        Ok(self.root.clone())
    }

    fn state(&self, id: StorageId) -> Result<StorageState, StorageError> {
        self.check_id(id)?;
        Ok(StorageState::Mounted)
    }

    fn space(&self, id: StorageId) -> Result<Space, StorageError> {
        self.check_id(id)?;

        let stat = self.stats.stat(&self.stat_path).map_err(|e| {
            error!("Failed to get internal memory size of {:?}: {}", self.stat_path, e);
            StorageError::io(format!("statvfs {:?}: {e}", self.stat_path))
        })?;
        Ok(self.capacity.apply(&stat))
    }

    fn ringtones_directory(&self, id: StorageId) -> Result<PathBuf, StorageError> {
        self.check_id(id)?;

        let ringtone = self.settings.ringtone_path().map_err(|e| {
            warn!("Failed to look up the current ringtone: {}", e);
            StorageError::from(e)
        })?;

        match ringtone.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => Ok(parent.to_path_buf()),
            _ => Err(StorageError::operation_failed(format!(
                "ringtone path {ringtone:?} has no parent directory"
            ))),
        }
    }
}

impl std::fmt::Debug for InternalBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InternalBackend")
            .field("id", &self.id)
            .field("root", &self.root)
            .field("stat_path", &self.stat_path)
            .field("capacity", &self.capacity)
            .finish_non_exhaustive()
    }
}
