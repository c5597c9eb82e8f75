// SPDX-License-Identifier: GPL-3.0-only

#![allow(dead_code)]

use std::io::Write;
use std::sync::Arc;

use storage_info::{InternalBackend, RemovableBackend, StorageId, StorageRegistry};
use storage_sys::CapacityPolicy;
use storage_testing::{FakeDeviceManager, FakeFilesystemStats, FakeSettings, sdcard};
use tempfile::NamedTempFile;

pub const INTERNAL_ROOT: &str = "/opt/usr/media";
pub const INTERNAL_STAT_PATH: &str = "/opt/usr";
pub const SDCARD_MOUNT: &str = "/opt/media/SDCardA1";
pub const RINGTONE: &str = "/opt/usr/share/settings/Ringtones/ringtone_sdk.mp3";

pub struct Fixture {
    pub registry: StorageRegistry,
    pub devices: FakeDeviceManager,
    pub stats: FakeFilesystemStats,
    pub settings: FakeSettings,
    reserve_config: NamedTempFile,
}

pub fn reserve_config(content: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("temp file");
    file.write_all(content.as_bytes()).expect("write reserve config");
    file
}

/// Internal storage 0 plus a mounted sdcard with id 5
pub fn fixture() -> Fixture {
    fixture_with_reserve("[STORAGE]\n")
}

pub fn fixture_with_reserve(reserve: &str) -> Fixture {
    storage_testing::init_tracing();

    let devices = FakeDeviceManager::with_devices([sdcard(5, SDCARD_MOUNT)]);
    let stats = FakeFilesystemStats::new()
        .with(INTERNAL_STAT_PATH, FakeFilesystemStats::uniform(4096, 1_000_000, 250_000))
        .with(SDCARD_MOUNT, FakeFilesystemStats::uniform(32_768, 1_000, 400));
    let settings = FakeSettings::with_ringtone(RINGTONE);
    let reserve_config = reserve_config(reserve);

    let registry = StorageRegistry::builder()
        .provider(InternalBackend::new(
            StorageId::new(0),
            INTERNAL_ROOT,
            INTERNAL_STAT_PATH,
            Arc::new(stats.clone()),
            CapacityPolicy::new(reserve_config.path()),
            Arc::new(settings.clone()),
        ))
        .provider(RemovableBackend::new(
            Arc::new(devices.clone()),
            Arc::new(stats.clone()),
        ))
        .build();

    Fixture {
        registry,
        devices,
        stats,
        settings,
        reserve_config,
    }
}
