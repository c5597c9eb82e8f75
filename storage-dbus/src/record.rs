// SPDX-License-Identifier: GPL-3.0-only

//! Wire format of a device record: `(issssssisibii)`

use storage_contracts::DeviceManagerError;
use storage_types::{DeviceBus, DeviceFlags, DeviceRecord, MountState, StorageId};

/// Device record exactly as it travels on the bus
///
/// Fields in order: bus type, devnode, syspath, fs usage, fs type,
/// fs version, fs uuid, readonly, mount point, mount state, primary,
/// flags, storage id.
pub type RawBlockDevice = (
    i32,
    String,
    String,
    String,
    String,
    String,
    String,
    i32,
    String,
    i32,
    bool,
    i32,
    i32,
);

/// Decode a wire record
///
/// Unknown ids come back with a negative storage id and unspecified other
/// fields; those are decoded leniently so callers can recognise the sentinel.
pub fn decode_device(raw: RawBlockDevice) -> Result<DeviceRecord, DeviceManagerError> {
    let (
        bus,
        devnode,
        syspath,
        fs_usage,
        fs_type,
        fs_version,
        fs_uuid,
        readonly,
        mount_point,
        mount_state,
        primary,
        flags,
        storage_id,
    ) = raw;

    let unknown = storage_id < 0;

    let bus = match DeviceBus::from_raw(bus) {
        Some(bus) => bus,
        None if unknown => DeviceBus::Scsi,
        None => {
            return Err(DeviceManagerError::MalformedReply(format!(
                "unknown bus type {bus} for {devnode}"
            )));
        }
    };

    let mount_state = match MountState::from_raw(mount_state) {
        Some(state) => state,
        None if unknown => MountState::Unmounted,
        None => {
            return Err(DeviceManagerError::MalformedReply(format!(
                "unknown mount state {mount_state} for {devnode}"
            )));
        }
    };

    Ok(DeviceRecord {
        bus,
        devnode,
        syspath,
        fs_usage,
        fs_type,
        fs_version,
        fs_uuid,
        readonly: readonly != 0,
        mount_point,
        mount_state,
        primary,
        flags: DeviceFlags::from_bits_truncate(flags as u32),
        storage_id: StorageId::new(storage_id),
    })
}
