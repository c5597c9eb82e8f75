// SPDX-License-Identifier: GPL-3.0-only

//! Bridge between the registry and the system device manager

use std::path::PathBuf;
use std::sync::Arc;

use storage_contracts::{DeviceManager, StorageError};
use storage_types::{DeviceEventKind, DeviceRecord, MountState, StorageId, StorageState};
use tracing::{debug, warn};

/// Resolves external storage ids to live device records
///
/// Every call goes to the device manager; nothing is cached. Transport
/// failures surface as [`StorageErrorKind::Io`](storage_contracts::StorageErrorKind::Io).
#[derive(Clone)]
pub struct ExternalDeviceResolver {
    manager: Arc<dyn DeviceManager>,
}

impl ExternalDeviceResolver {
    pub fn new(manager: Arc<dyn DeviceManager>) -> Self {
        Self { manager }
    }

    /// Snapshot of every device currently known to the manager
    pub fn list_devices(&self) -> Result<Vec<DeviceRecord>, StorageError> {
        self.manager.list_devices().map_err(|e| {
            warn!("Failed to list external devices: {}", e);
            StorageError::from(e)
        })
    }

    pub fn get_device(&self, id: StorageId) -> Result<DeviceRecord, StorageError> {
        let device = self.manager.device_info(id).map_err(|e| {
            warn!("Cannot get the storage with id {}: {}", id, e);
            StorageError::from(e)
        })?;

        if !device.storage_id.is_valid() {
            debug!("Storage {} is not a live device", id);
            return Err(StorageError::no_such_device(format!(
                "storage {id} does not resolve to a device"
            )));
        }
        Ok(device)
    }

    /// Public state of `device` as seen through an event of `event`
    ///
    /// A freshly added device is not yet confirmed mounted, so it reports
    /// `Unmountable` until the matching change event arrives.
    pub fn translate_state(device: &DeviceRecord, event: DeviceEventKind) -> StorageState {
        match event {
            DeviceEventKind::Added => StorageState::Unmountable,
            DeviceEventKind::Removed => StorageState::Removed,
            DeviceEventKind::Changed => match device.mount_state {
                MountState::Unmounted => StorageState::Unmountable,
                MountState::Mounted if device.is_read_only_mount() => {
                    StorageState::MountedReadOnly
                }
                MountState::Mounted => StorageState::Mounted,
            },
        }
    }

    /// Current state of a device fetched by query rather than by event
    pub fn device_state(device: &DeviceRecord) -> StorageState {
        Self::translate_state(device, DeviceEventKind::Changed)
    }

    /// Mount point of the first device flagged as a primary partition
    pub fn get_primary_mount_path(&self) -> Result<PathBuf, StorageError> {
        self.list_devices()?
            .into_iter()
            .find(|device| device.primary)
            .map(|device| PathBuf::from(device.mount_point))
            .ok_or_else(|| StorageError::no_such_device("no primary partition is present"))
    }

    /// The manager's own primary sdcard partition
    pub fn primary_device(&self) -> Result<DeviceRecord, StorageError> {
        let device = self.manager.primary_sdcard().map_err(|e| {
            warn!("Failed to look up the primary sdcard: {}", e);
            StorageError::from(e)
        })?;

        if !device.storage_id.is_valid() {
            return Err(StorageError::no_such_device("no sdcard is inserted"));
        }
        Ok(device)
    }
}

impl std::fmt::Debug for ExternalDeviceResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExternalDeviceResolver").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use storage_contracts::{DeviceManagerError, StorageErrorKind};
    use storage_testing::{FakeDeviceManager, sdcard, usb_drive};
    use storage_types::DeviceFlag;

    use super::*;

    fn resolver(manager: &FakeDeviceManager) -> ExternalDeviceResolver {
        ExternalDeviceResolver::new(Arc::new(manager.clone()))
    }

    #[test]
    fn event_kinds_translate_to_public_states() {
        let mut device = sdcard(5, "/media/sd");
        assert_eq!(
            ExternalDeviceResolver::translate_state(&device, DeviceEventKind::Added),
            StorageState::Unmountable
        );
        assert_eq!(
            ExternalDeviceResolver::translate_state(&device, DeviceEventKind::Removed),
            StorageState::Removed
        );
        assert_eq!(
            ExternalDeviceResolver::translate_state(&device, DeviceEventKind::Changed),
            StorageState::Mounted
        );

        device.flags.insert(DeviceFlag::MountReadOnly);
        assert_eq!(
            ExternalDeviceResolver::device_state(&device),
            StorageState::MountedReadOnly
        );

        device.mount_state = MountState::Unmounted;
        assert_eq!(
            ExternalDeviceResolver::device_state(&device),
            StorageState::Unmountable
        );
    }

    #[test]
    fn negative_upstream_id_is_no_such_device() {
        let manager = FakeDeviceManager::with_devices([sdcard(5, "/media/sd")]);
        let resolver = resolver(&manager);

        assert_eq!(
            resolver.get_device(StorageId::new(5)).expect("device").mount_point,
            "/media/sd"
        );
        let err = resolver.get_device(StorageId::new(6)).expect_err("unknown");
        assert_eq!(err.kind, StorageErrorKind::NoSuchDevice);
    }

    #[test]
    fn transport_failures_are_io() {
        let manager = FakeDeviceManager::with_devices([sdcard(5, "/media/sd")]);
        manager.fail_calls(Some(DeviceManagerError::Connection("bus down".to_string())));

        let err = resolver(&manager).list_devices().expect_err("failure");
        assert_eq!(err.kind, StorageErrorKind::Io);
    }

    #[test]
    fn primary_mount_path_scans_the_list() {
        let manager = FakeDeviceManager::with_devices([usb_drive(3, "/media/usb")]);
        let resolver = resolver(&manager);

        let err = resolver.get_primary_mount_path().expect_err("no primary");
        assert_eq!(err.kind, StorageErrorKind::NoSuchDevice);

        manager.insert(sdcard(5, "/media/sd"));
        assert_eq!(
            resolver.get_primary_mount_path().expect("primary"),
            PathBuf::from("/media/sd")
        );
        assert_eq!(
            resolver.primary_device().expect("primary").storage_id,
            StorageId::new(5)
        );
    }
}
