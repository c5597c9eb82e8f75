// SPDX-License-Identifier: GPL-3.0-only

use std::sync::{Arc, Mutex, MutexGuard};

use storage_contracts::{DeviceEventHandler, DeviceManager, DeviceManagerError, DeviceWatch};
use storage_types::{
    DeviceBus, DeviceEvent, DeviceEventKind, DeviceFlags, DeviceRecord, MountState, StorageId,
};

/// A mounted sdcard partition as the device manager reports it
pub fn sdcard(id: i32, mount_point: &str) -> DeviceRecord {
    DeviceRecord {
        bus: DeviceBus::Mmc,
        devnode: format!("/dev/mmcblk1p{}", id.max(0) + 1),
        syspath: "/sys/block/mmcblk1".to_string(),
        fs_usage: "filesystem".to_string(),
        fs_type: "vfat".to_string(),
        fs_version: "FAT32".to_string(),
        fs_uuid: format!("{:04X}-0001", id.max(0)),
        readonly: false,
        mount_point: mount_point.to_string(),
        mount_state: MountState::Mounted,
        primary: true,
        flags: DeviceFlags::empty(),
        storage_id: StorageId::new(id),
    }
}

/// A mounted USB mass storage partition
pub fn usb_drive(id: i32, mount_point: &str) -> DeviceRecord {
    DeviceRecord {
        bus: DeviceBus::Scsi,
        devnode: format!("/dev/sda{}", id.max(0) + 1),
        syspath: "/sys/block/sda".to_string(),
        fs_type: "ext4".to_string(),
        fs_version: "1.0".to_string(),
        primary: false,
        ..sdcard(id, mount_point)
    }
}

/// Record the device manager returns for ids it does not know
fn unknown_device() -> DeviceRecord {
    DeviceRecord {
        mount_point: String::new(),
        mount_state: MountState::Unmounted,
        primary: false,
        ..sdcard(-1, "")
    }
}

#[derive(Default)]
struct State {
    devices: Vec<DeviceRecord>,
    watches: Vec<(u64, DeviceEventHandler)>,
    next_watch: u64,
    armed: usize,
    disarmed: usize,
    list_error: Option<DeviceManagerError>,
    watch_error: Option<DeviceManagerError>,
}

/// In-memory device manager with event injection
///
/// Events passed to [`FakeDeviceManager::emit`] are delivered synchronously on
/// the calling thread to every live watch.
#[derive(Clone, Default)]
pub struct FakeDeviceManager {
    state: Arc<Mutex<State>>,
}

impl FakeDeviceManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_devices(devices: impl IntoIterator<Item = DeviceRecord>) -> Self {
        let manager = Self::new();
        manager.lock().devices.extend(devices);
        manager
    }

    /// Insert or replace the device with the same storage id
    pub fn insert(&self, device: DeviceRecord) {
        let mut state = self.lock();
        match state
            .devices
            .iter_mut()
            .find(|existing| existing.storage_id == device.storage_id)
        {
            Some(existing) => *existing = device,
            None => state.devices.push(device),
        }
    }

    pub fn remove(&self, id: StorageId) -> Option<DeviceRecord> {
        let mut state = self.lock();
        let index = state.devices.iter().position(|d| d.storage_id == id)?;
        Some(state.devices.remove(index))
    }

    /// Make every list/lookup call fail until cleared with `None`
    pub fn fail_calls(&self, error: Option<DeviceManagerError>) {
        self.lock().list_error = error;
    }

    /// Make arming a watch fail until cleared with `None`
    pub fn fail_watch(&self, error: Option<DeviceManagerError>) {
        self.lock().watch_error = error;
    }

    /// Deliver `kind` for `device` to every live watch
    pub fn emit(&self, kind: DeviceEventKind, device: DeviceRecord) {
        let handlers: Vec<DeviceEventHandler> = self
            .lock()
            .watches
            .iter()
            .map(|(_, handler)| handler.clone())
            .collect();

        for handler in handlers {
            handler(DeviceEvent {
                kind,
                device: device.clone(),
            });
        }
    }

    /// Number of watches ever armed
    pub fn armed_count(&self) -> usize {
        self.lock().armed
    }

    /// Number of watches dropped so far
    pub fn disarmed_count(&self) -> usize {
        self.lock().disarmed
    }

    pub fn active_watches(&self) -> usize {
        self.lock().watches.len()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn check_calls(&self) -> Result<MutexGuard<'_, State>, DeviceManagerError> {
        let state = self.lock();
        match &state.list_error {
            Some(err) => Err(err.clone()),
            None => Ok(state),
        }
    }
}

impl DeviceManager for FakeDeviceManager {
    fn list_devices(&self) -> Result<Vec<DeviceRecord>, DeviceManagerError> {
        Ok(self.check_calls()?.devices.clone())
    }

    fn device_info(&self, id: StorageId) -> Result<DeviceRecord, DeviceManagerError> {
        let state = self.check_calls()?;
        Ok(state
            .devices
            .iter()
            .find(|device| device.storage_id == id)
            .cloned()
            .unwrap_or_else(unknown_device))
    }

    fn primary_sdcard(&self) -> Result<DeviceRecord, DeviceManagerError> {
        let state = self.check_calls()?;
        Ok(state
            .devices
            .iter()
            .find(|device| device.bus == DeviceBus::Mmc && device.primary)
            .cloned()
            .unwrap_or_else(unknown_device))
    }

    fn watch(&self, handler: DeviceEventHandler) -> Result<DeviceWatch, DeviceManagerError> {
        let mut state = self.lock();
        if let Some(err) = &state.watch_error {
            return Err(err.clone());
        }

        let token = state.next_watch;
        state.next_watch += 1;
        state.armed += 1;
        state.watches.push((token, handler));

        let shared = Arc::downgrade(&self.state);
        Ok(DeviceWatch::new(move || {
            if let Some(shared) = shared.upgrade() {
                let mut state = shared.lock().unwrap_or_else(|p| p.into_inner());
                state.watches.retain(|(id, _)| *id != token);
                state.disarmed += 1;
            }
        }))
    }
}
