// SPDX-License-Identifier: GPL-3.0-only

mod common;

use std::ops::ControlFlow;
use std::path::{Path, PathBuf};

use common::{INTERNAL_ROOT, SDCARD_MOUNT, fixture, fixture_with_reserve};
use storage_contracts::DeviceManagerError;
use storage_info::{
    DirectoryCategory, StorageErrorKind, StorageId, StorageInfo, StorageKind, StorageState,
};
use storage_testing::{sdcard, usb_drive};
use storage_types::{DeviceEventKind, MountState};

#[test]
fn enumerates_internal_then_removable() {
    let fixture = fixture();

    let mut visits = Vec::new();
    fixture.registry.enumerate(|storage| {
        visits.push(storage.clone());
        ControlFlow::Continue(())
    });

    assert_eq!(
        visits,
        vec![
            StorageInfo {
                id: StorageId::new(0),
                kind: StorageKind::Internal,
                state: StorageState::Mounted,
                root: PathBuf::from(INTERNAL_ROOT),
            },
            StorageInfo {
                id: StorageId::new(5),
                kind: StorageKind::External,
                state: StorageState::Mounted,
                root: PathBuf::from(SDCARD_MOUNT),
            },
        ]
    );
}

#[test]
fn enumeration_stops_when_the_visitor_breaks() {
    let fixture = fixture();
    fixture.devices.insert(usb_drive(7, "/opt/media/USBDriveA1"));

    let mut visited = 0;
    fixture.registry.enumerate(|_| {
        visited += 1;
        if visited == 2 {
            ControlFlow::Break(())
        } else {
            ControlFlow::Continue(())
        }
    });
    assert_eq!(visited, 2);
    assert_eq!(fixture.registry.storages().len(), 3);
}

#[test]
fn enumeration_survives_device_manager_failure() {
    let fixture = fixture();
    fixture
        .devices
        .fail_calls(Some(DeviceManagerError::Connection("bus down".to_string())));

    let storages = fixture.registry.storages();
    assert_eq!(storages.len(), 1);
    assert_eq!(storages[0].kind, StorageKind::Internal);
}

#[test]
fn directories_are_subpaths_of_the_root() {
    let fixture = fixture();

    assert_eq!(
        fixture
            .registry
            .get_directory(StorageId::new(0), DirectoryCategory::Images)
            .expect("images"),
        PathBuf::from("/opt/usr/media/Images")
    );
    assert_eq!(
        fixture
            .registry
            .get_directory(StorageId::new(0), DirectoryCategory::Camera)
            .expect("camera"),
        PathBuf::from("/opt/usr/media/DCIM")
    );

    for id in [StorageId::new(0), StorageId::new(5)] {
        let root = fixture.registry.get_root(id).expect("root");
        let others = fixture
            .registry
            .get_directory(id, DirectoryCategory::Others)
            .expect("others");
        assert_eq!(others, root.join("Others"));
    }
}

#[test]
fn system_ringtones_only_exist_on_internal_storage() {
    let fixture = fixture();

    assert_eq!(
        fixture
            .registry
            .get_directory(StorageId::new(0), DirectoryCategory::SystemRingtones)
            .expect("ringtones"),
        PathBuf::from("/opt/usr/share/settings/Ringtones")
    );

    let err = fixture
        .registry
        .get_directory(StorageId::new(5), DirectoryCategory::SystemRingtones)
        .expect_err("external ringtones");
    assert_eq!(err.kind, StorageErrorKind::NotSupported);
}

#[test]
fn type_agrees_with_enumeration() {
    let fixture = fixture();

    for storage in fixture.registry.storages() {
        assert_eq!(
            fixture.registry.get_type(storage.id).expect("type"),
            storage.kind
        );
    }
}

#[test]
fn removable_device_cannot_shadow_internal_storage() {
    let fixture = fixture();
    fixture.devices.insert(sdcard(0, "/media/sd"));

    let storages = fixture.registry.storages();
    let ids: Vec<_> = storages.iter().map(|storage| storage.id).collect();
    assert_eq!(ids, vec![StorageId::new(0), StorageId::new(5)]);

    for storage in &storages {
        assert_eq!(
            fixture.registry.get_type(storage.id).expect("type"),
            storage.kind
        );
        assert_eq!(
            fixture.registry.get_root(storage.id).expect("root"),
            storage.root
        );
    }
    assert_eq!(
        fixture.registry.get_root(StorageId::new(0)).expect("root"),
        PathBuf::from(INTERNAL_ROOT)
    );

    // The colliding card is the only primary sdcard left
    fixture.devices.remove(StorageId::new(5));
    let err = fixture
        .registry
        .primary_sdcard()
        .expect_err("colliding sdcard");
    assert_eq!(err.kind, StorageErrorKind::NoSuchDevice);
}

#[test]
fn unknown_id_fails_every_query() {
    let fixture = fixture();
    let id = StorageId::new(9999);
    let absent = [StorageErrorKind::NotSupported, StorageErrorKind::NoSuchDevice];

    assert!(absent.contains(&fixture.registry.get_root(id).expect_err("root").kind));
    assert!(absent.contains(&fixture.registry.get_type(id).expect_err("type").kind));
    assert!(absent.contains(&fixture.registry.get_state(id).expect_err("state").kind));
    assert!(absent.contains(
        &fixture
            .registry
            .get_total_space(id)
            .expect_err("total")
            .kind
    ));
    assert!(absent.contains(
        &fixture
            .registry
            .get_available_space(id)
            .expect_err("available")
            .kind
    ));
    assert!(absent.contains(
        &fixture
            .registry
            .get_directory(id, DirectoryCategory::Music)
            .expect_err("directory")
            .kind
    ));
}

#[test]
fn removed_device_no_longer_resolves() {
    let fixture = fixture();
    assert_eq!(
        fixture.registry.get_state(StorageId::new(5)).expect("state"),
        StorageState::Mounted
    );

    let device = fixture.devices.remove(StorageId::new(5)).expect("present");
    fixture.devices.emit(DeviceEventKind::Removed, device);

    let err = fixture
        .registry
        .get_state(StorageId::new(5))
        .expect_err("removed");
    assert_eq!(err.kind, StorageErrorKind::NoSuchDevice);
}

#[test]
fn device_manager_failure_is_operation_failure() {
    let fixture = fixture();
    fixture.devices.fail_calls(Some(DeviceManagerError::Call {
        method: "GetDeviceInfo".to_string(),
        message: "timeout".to_string(),
    }));

    let err = fixture
        .registry
        .get_root(StorageId::new(5))
        .expect_err("transport failure");
    assert_eq!(err.kind, StorageErrorKind::OperationFailed);
}

#[test]
fn external_capacity_follows_mount_state() {
    let fixture = fixture();
    assert_eq!(
        fixture
            .registry
            .get_total_space(StorageId::new(5))
            .expect("total"),
        32_768 * 1_000
    );
    assert_eq!(
        fixture
            .registry
            .get_available_space(StorageId::new(5))
            .expect("available"),
        32_768 * 400
    );

    let mut unmounted = sdcard(5, "");
    unmounted.mount_state = MountState::Unmounted;
    fixture.devices.insert(unmounted);
    assert_eq!(
        fixture
            .registry
            .get_state(StorageId::new(5))
            .expect("state"),
        StorageState::Unmountable
    );
    assert_eq!(
        fixture
            .registry
            .get_total_space(StorageId::new(5))
            .expect("total"),
        0
    );
}

#[test]
fn unreadable_mount_point_is_operation_failure() {
    let fixture = fixture();
    fixture.stats.remove(Path::new(SDCARD_MOUNT));

    let err = fixture
        .registry
        .get_total_space(StorageId::new(5))
        .expect_err("stat fails");
    assert_eq!(err.kind, StorageErrorKind::OperationFailed);
    assert_eq!(
        fixture.registry.get_root(StorageId::new(5)).expect("root"),
        PathBuf::from(SDCARD_MOUNT)
    );
}

#[test]
fn internal_available_space_deducts_reserve_and_never_exceeds_total() {
    // 1 GB reserve on a 4 GB filesystem with 1 GB available
    let fixture = fixture_with_reserve(
        "[STORAGE]\nCHECK_SIZE=1073741824 # 1G\nRESERVE=1073741824\nRESERVE_LITE=4096\n",
    );

    let total = fixture
        .registry
        .get_total_space(StorageId::new(0))
        .expect("total");
    let available = fixture
        .registry
        .get_available_space(StorageId::new(0))
        .expect("available");

    assert_eq!(total, 4096 * 1_000_000);
    assert_eq!(available, 0);
    assert!(available <= total);
}

#[test]
fn internal_reserve_is_applied_in_blocks() {
    let fixture = fixture_with_reserve("[STORAGE]\nCHECK_SIZE=1\nRESERVE=409600\n");

    assert_eq!(
        fixture
            .registry
            .get_available_space(StorageId::new(0))
            .expect("available"),
        4096 * (250_000 - 100)
    );
}

#[test]
fn primary_sdcard_reports_id_and_mount_point() {
    let fixture = fixture();
    assert_eq!(
        fixture.registry.primary_sdcard().expect("primary"),
        (StorageId::new(5), PathBuf::from(SDCARD_MOUNT))
    );

    fixture.devices.remove(StorageId::new(5));
    let err = fixture.registry.primary_sdcard().expect_err("no sdcard");
    assert_eq!(err.kind, StorageErrorKind::NoSuchDevice);
}
