// SPDX-License-Identifier: GPL-3.0-only

//! Storage providers
//!
//! A provider answers for one class of storage. Built-in providers own a
//! single fixed id; a dynamic provider resolves ids at query time and may
//! answer for any number of devices, or none.

mod internal;
mod removable;

use std::path::PathBuf;

use storage_contracts::StorageError;
use storage_types::{Space, StorageId, StorageInfo, StorageKind, StorageState};

use crate::callbacks::{DeviceChangedCallback, StateChangedCallback};

pub use internal::InternalBackend;
pub use removable::RemovableBackend;

pub trait StorageProvider: Send + Sync {
    fn kind(&self) -> StorageKind;

    /// The id a built-in provider always answers for, `None` for providers
    /// that resolve ids dynamically
    fn fixed_id(&self) -> Option<StorageId>;

    /// Storages currently provided, in the order they should be reported
    fn list(&self) -> Result<Vec<StorageInfo>, StorageError>;

    fn root(&self, id: StorageId) -> Result<PathBuf, StorageError>;

    fn state(&self, id: StorageId) -> Result<StorageState, StorageError>;

    fn space(&self, id: StorageId) -> Result<Space, StorageError>;

    /// Directory holding the system ringtones
    fn ringtones_directory(&self, id: StorageId) -> Result<PathBuf, StorageError> {
        Err(StorageError::not_supported(format!(
            "storage {id} has no system ringtones directory"
        )))
    }

    /// Storage that never changes state accepts subscriptions without
    /// storing them
    fn register_state_changed(
        &self,
        _id: StorageId,
        _callback: StateChangedCallback,
    ) -> Result<(), StorageError> {
        Ok(())
    }

    fn unregister_state_changed(
        &self,
        _id: StorageId,
        _callback: &StateChangedCallback,
    ) -> Result<(), StorageError> {
        Ok(())
    }

    /// The primary sdcard partition and its mount point
    fn primary_sdcard(&self) -> Result<(StorageId, PathBuf), StorageError> {
        Err(StorageError::not_supported(format!(
            "{} storage has no sdcard",
            self.kind()
        )))
    }

    fn register_device_changed(&self, _callback: DeviceChangedCallback) -> Result<(), StorageError> {
        Err(StorageError::not_supported(format!(
            "{} storage reports no device changes",
            self.kind()
        )))
    }

    fn unregister_device_changed(
        &self,
        _callback: &DeviceChangedCallback,
    ) -> Result<(), StorageError> {
        Err(StorageError::not_supported(format!(
            "{} storage reports no device changes",
            self.kind()
        )))
    }
}
