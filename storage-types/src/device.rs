// SPDX-License-Identifier: GPL-3.0-only

//! Removable device records as reported by the block device manager
//!
//! A [`DeviceRecord`] is a snapshot. It is rebuilt on every query and on
//! every change notification; nothing here is cached between calls.

use enumflags2::{BitFlags, bitflags};
use serde::{Deserialize, Serialize};

use crate::{StorageId, StorageState};

/// Bus a removable block device is attached through
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceBus {
    Scsi,
    Mmc,
}

impl DeviceBus {
    pub fn from_raw(raw: i32) -> Option<Self> {
        match raw {
            0 => Some(DeviceBus::Scsi),
            1 => Some(DeviceBus::Mmc),
            _ => None,
        }
    }
}

/// Public device type reported to device-changed subscribers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExternalDeviceType {
    SdCard,
    UsbMassStorage,
}

impl From<DeviceBus> for ExternalDeviceType {
    fn from(bus: DeviceBus) -> Self {
        match bus {
            DeviceBus::Mmc => ExternalDeviceType::SdCard,
            DeviceBus::Scsi => ExternalDeviceType::UsbMassStorage,
        }
    }
}

/// Raw mount state carried on the device record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MountState {
    Unmounted,
    Mounted,
}

impl MountState {
    pub fn from_raw(raw: i32) -> Option<Self> {
        match raw {
            0 => Some(MountState::Unmounted),
            1 => Some(MountState::Mounted),
            _ => None,
        }
    }
}

/// Status flag bits reported by the device manager
#[bitflags]
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DeviceFlag {
    UnmountUnsafe = 1 << 0,
    FsBroken = 1 << 1,
    FsEmpty = 1 << 2,
    FsNotSupported = 1 << 3,
    MountReadOnly = 1 << 4,
}

pub type DeviceFlags = BitFlags<DeviceFlag>;

/// One physical removable unit (or one partition of it)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceRecord {
    pub bus: DeviceBus,

    /// Device node (e.g., "/dev/mmcblk1p1")
    pub devnode: String,

    /// Sysfs path of the block device
    pub syspath: String,

    pub fs_usage: String,
    pub fs_type: String,
    pub fs_version: String,
    pub fs_uuid: String,

    /// Whether the block device itself is read-only
    pub readonly: bool,

    /// Where the filesystem is mounted, empty when unmounted
    pub mount_point: String,

    pub mount_state: MountState,

    /// Whether this is the first partition of the unit
    pub primary: bool,

    pub flags: DeviceFlags,

    /// Id assigned by the device manager; negative when the device is unknown
    pub storage_id: StorageId,
}

impl DeviceRecord {
    pub fn device_type(&self) -> ExternalDeviceType {
        self.bus.into()
    }

    pub fn is_read_only_mount(&self) -> bool {
        self.flags.contains(DeviceFlag::MountReadOnly)
    }
}

/// What happened to a device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceEventKind {
    Added,
    Removed,
    Changed,
}

/// Change notification fired by the device manager
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceEvent {
    pub kind: DeviceEventKind,
    pub device: DeviceRecord,
}

/// Payload delivered to per-kind device-changed subscribers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceChange {
    pub storage_id: StorageId,
    pub device_type: ExternalDeviceType,
    pub state: StorageState,
    pub fs_type: String,
    pub fs_uuid: String,
    pub mount_path: String,
    pub primary: bool,
    pub flags: DeviceFlags,
}

impl DeviceChange {
    pub fn new(device: &DeviceRecord, state: StorageState) -> Self {
        Self {
            storage_id: device.storage_id,
            device_type: device.device_type(),
            state,
            fs_type: device.fs_type.clone(),
            fs_uuid: device.fs_uuid.clone(),
            mount_path: device.mount_point.clone(),
            primary: device.primary,
            flags: device.flags,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sdcard() -> DeviceRecord {
        DeviceRecord {
            bus: DeviceBus::Mmc,
            devnode: "/dev/mmcblk1p1".to_string(),
            syspath: "/sys/block/mmcblk1/mmcblk1p1".to_string(),
            fs_usage: "filesystem".to_string(),
            fs_type: "vfat".to_string(),
            fs_version: "FAT32".to_string(),
            fs_uuid: "1234-ABCD".to_string(),
            readonly: false,
            mount_point: "/opt/media/SDCardA1".to_string(),
            mount_state: MountState::Mounted,
            primary: true,
            flags: DeviceFlag::MountReadOnly | DeviceFlag::UnmountUnsafe,
            storage_id: StorageId::new(5),
        }
    }

    #[test]
    fn bus_determines_public_device_type() {
        assert_eq!(sdcard().device_type(), ExternalDeviceType::SdCard);
        assert_eq!(
            ExternalDeviceType::from(DeviceBus::Scsi),
            ExternalDeviceType::UsbMassStorage
        );
    }

    #[test]
    fn unknown_raw_values_are_rejected() {
        assert_eq!(DeviceBus::from_raw(2), None);
        assert_eq!(MountState::from_raw(-1), None);
        assert_eq!(MountState::from_raw(1), Some(MountState::Mounted));
    }

    #[test]
    fn change_payload_copies_device_fields() {
        let device = sdcard();
        let change = DeviceChange::new(&device, StorageState::MountedReadOnly);

        assert_eq!(change.storage_id, StorageId::new(5));
        assert_eq!(change.mount_path, "/opt/media/SDCardA1");
        assert_eq!(change.fs_uuid, "1234-ABCD");
        assert!(change.primary);
        assert!(change.flags.contains(DeviceFlag::MountReadOnly));
    }
}
