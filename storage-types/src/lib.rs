// SPDX-License-Identifier: GPL-3.0-only

//! Canonical domain models for the storage information service
//!
//! These types are shared by every layer of the stack:
//!
//! - **storage-dbus**: decodes device manager replies into [`DeviceRecord`]
//! - **storage-sys**: reports filesystem statistics consumed as [`Space`]
//! - **storage-info**: the registry answers every query in these terms
//!
//! ## Identity
//!
//! A [`StorageId`] is intrinsic: internal storage carries a fixed id and
//! every removable device carries the id assigned by the device manager.
//! Ids never depend on enumeration order, so an id handed out before a
//! hot-plug event still names the same storage afterwards.

pub mod device;
pub mod directory;
pub mod storage;

pub use device::{
    DeviceBus, DeviceChange, DeviceEvent, DeviceEventKind, DeviceFlag, DeviceFlags, DeviceRecord,
    ExternalDeviceType, MountState,
};
pub use directory::DirectoryCategory;
pub use storage::{Space, StorageId, StorageInfo, StorageKind, StorageState};
