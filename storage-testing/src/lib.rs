// SPDX-License-Identifier: GPL-3.0-only

//! Fakes for every collaborator of the storage information service
//!
//! Each fake is cheap to clone and shares its state between clones, so a test
//! can hand one clone to the registry and keep another to steer it.

pub mod device;
pub mod filesystem;
pub mod logging;
pub mod settings;

pub use device::{FakeDeviceManager, sdcard, usb_drive};
pub use filesystem::FakeFilesystemStats;
pub use logging::init_tracing;
pub use settings::FakeSettings;
