// SPDX-License-Identifier: GPL-3.0-only

use std::path::PathBuf;
use std::sync::Arc;

use storage_contracts::{DeviceManager, FilesystemStats, StorageError};
use storage_types::{Space, StorageId, StorageInfo, StorageKind, StorageState};
use tracing::{error, warn};

use super::StorageProvider;
use crate::callbacks::{CallbackRegistry, DeviceChangedCallback, StateChangedCallback};
use crate::resolver::ExternalDeviceResolver;

/// Hot-pluggable media resolved through the system device manager
///
/// Answers for every id the device manager currently knows. Nothing is
/// cached: each query fetches a fresh device record.
pub struct RemovableBackend {
    resolver: ExternalDeviceResolver,
    callbacks: CallbackRegistry,
    stats: Arc<dyn FilesystemStats>,
}

impl RemovableBackend {
    pub fn new(manager: Arc<dyn DeviceManager>, stats: Arc<dyn FilesystemStats>) -> Self {
        Self {
            resolver: ExternalDeviceResolver::new(manager.clone()),
            callbacks: CallbackRegistry::new(manager),
            stats,
        }
    }
}

impl StorageProvider for RemovableBackend {
    fn kind(&self) -> StorageKind {
        StorageKind::External
    }

    fn fixed_id(&self) -> Option<StorageId> {
        None
    }

    fn list(&self) -> Result<Vec<StorageInfo>, StorageError> {
        let storages = self
            .resolver
            .list_devices()?
            .into_iter()
            .filter(|device| {
                let valid = device.storage_id.is_valid();
                if !valid {
                    warn!("Skipping {} without a storage id", device.devnode);
                }
                valid
            })
            .map(|device| StorageInfo {
                id: device.storage_id,
                kind: StorageKind::External,
                state: ExternalDeviceResolver::device_state(&device),
                root: PathBuf::from(device.mount_point),
            })
            .collect();
        Ok(storages)
    }

    fn root(&self, id: StorageId) -> Result<PathBuf, StorageError> {
        let device = self.resolver.get_device(id)?;
        Ok(PathBuf::from(device.mount_point))
    }

    fn state(&self, id: StorageId) -> Result<StorageState, StorageError> {
        let device = self.resolver.get_device(id)?;
        Ok(ExternalDeviceResolver::device_state(&device))
    }

    /// Zero for media that is present but not mounted
    fn space(&self, id: StorageId) -> Result<Space, StorageError> {
        let device = self.resolver.get_device(id)?;
        if !ExternalDeviceResolver::device_state(&device).is_mounted() {
            return Ok(Space::EMPTY);
        }

        let stat = self
            .stats
            .stat(device.mount_point.as_ref())
            .map_err(|e| {
                error!(
                    "Failed to get external memory size of {}: {}",
                    device.mount_point, e
                );
                StorageError::io(format!("statvfs {}: {e}", device.mount_point))
            })?;
        Ok(Space::new(stat.total_bytes(), stat.available_bytes()))
    }

    fn primary_sdcard(&self) -> Result<(StorageId, PathBuf), StorageError> {
        let device = self.resolver.primary_device()?;
        Ok((device.storage_id, PathBuf::from(device.mount_point)))
    }

    /// Only a device the manager currently knows can be subscribed to
    fn register_state_changed(
        &self,
        id: StorageId,
        callback: StateChangedCallback,
    ) -> Result<(), StorageError> {
        self.resolver.get_device(id)?;
        self.callbacks.register_state_changed(id, callback)
    }

    fn unregister_state_changed(
        &self,
        id: StorageId,
        callback: &StateChangedCallback,
    ) -> Result<(), StorageError> {
        self.callbacks.unregister_state_changed(id, callback);
        Ok(())
    }

    fn register_device_changed(&self, callback: DeviceChangedCallback) -> Result<(), StorageError> {
        self.callbacks
            .register_device_changed(StorageKind::External, callback)
    }

    fn unregister_device_changed(
        &self,
        callback: &DeviceChangedCallback,
    ) -> Result<(), StorageError> {
        self.callbacks
            .unregister_device_changed(StorageKind::External, callback);
        Ok(())
    }
}

impl std::fmt::Debug for RemovableBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemovableBackend")
            .field("callbacks", &self.callbacks)
            .finish_non_exhaustive()
    }
}
