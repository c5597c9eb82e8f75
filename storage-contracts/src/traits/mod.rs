// SPDX-License-Identifier: GPL-3.0-only

pub mod device;
pub mod filesystem;
pub mod settings;

pub use device::{DeviceEventHandler, DeviceManager, DeviceManagerError, DeviceWatch};
pub use filesystem::{FilesystemStats, FsStat};
pub use settings::{SettingsError, SettingsProvider};
