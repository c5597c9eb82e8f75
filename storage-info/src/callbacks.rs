// SPDX-License-Identifier: GPL-3.0-only

//! Change subscriptions for removable storage
//!
//! Each [`CallbackKind`] keeps its own ordered subscriber list and its own
//! upstream [`DeviceWatch`]. The watch is armed when the first subscriber of a
//! kind registers and dropped when the last one leaves.

use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Mutex, MutexGuard, Weak};

use storage_contracts::{DeviceManager, DeviceWatch, StorageError};
use storage_types::{DeviceChange, DeviceEvent, StorageId, StorageKind, StorageState};
use tracing::{debug, info, warn};

use crate::resolver::ExternalDeviceResolver;

/// Called with the subscribed id and its new state
pub type StateChangedCallback = Arc<dyn Fn(StorageId, StorageState) + Send + Sync>;

/// Called with the full description of a changed device
pub type DeviceChangedCallback = Arc<dyn Fn(&DeviceChange) + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CallbackKind {
    /// Per storage id mount state changes
    StateChanged,
    /// Per storage kind device changes
    DeviceChanged,
}

struct Subscription<K, C: ?Sized> {
    subscriber: K,
    callback: Arc<C>,
}

struct Subscribers<K, C: ?Sized> {
    entries: Vec<Subscription<K, C>>,
    watch: Option<DeviceWatch>,
}

impl<K: PartialEq + Copy, C: ?Sized> Subscribers<K, C> {
    fn new() -> Self {
        Self {
            entries: Vec::new(),
            watch: None,
        }
    }

    fn position(&self, subscriber: K, callback: &Arc<C>) -> Option<usize> {
        self.entries.iter().position(|entry| {
            entry.subscriber == subscriber
                && std::ptr::addr_eq(Arc::as_ptr(&entry.callback), Arc::as_ptr(callback))
        })
    }

    fn matching(&self, subscriber: K) -> Vec<Arc<C>> {
        self.entries
            .iter()
            .filter(|entry| entry.subscriber == subscriber)
            .map(|entry| entry.callback.clone())
            .collect()
    }
}

type StateSubscribers = Subscribers<StorageId, dyn Fn(StorageId, StorageState) + Send + Sync>;
type DeviceSubscribers = Subscribers<StorageKind, dyn Fn(&DeviceChange) + Send + Sync>;

struct Lists {
    state_changed: StateSubscribers,
    device_changed: DeviceSubscribers,
}

/// Deduplicating subscriber store with upstream arm/disarm tracking
///
/// A subscription is identified by its subscriber key and the callback
/// allocation: registering a clone of the same `Arc` twice stores it once.
/// Callbacks run on the device manager's delivery thread, outside the
/// internal lock, so they may register or unregister themselves.
pub struct CallbackRegistry {
    manager: Arc<dyn DeviceManager>,
    lists: Arc<Mutex<Lists>>,
}

impl CallbackRegistry {
    pub fn new(manager: Arc<dyn DeviceManager>) -> Self {
        Self {
            manager,
            lists: Arc::new(Mutex::new(Lists {
                state_changed: Subscribers::new(),
                device_changed: Subscribers::new(),
            })),
        }
    }

    pub fn register_state_changed(
        &self,
        id: StorageId,
        callback: StateChangedCallback,
    ) -> Result<(), StorageError> {
        let mut lists = self.lock();
        if lists.state_changed.watch.is_none() {
            lists.state_changed.watch = Some(self.arm(CallbackKind::StateChanged)?);
        }

        if lists.state_changed.position(id, &callback).is_some() {
            debug!("State callback for storage {} is already registered", id);
            return Ok(());
        }

        lists.state_changed.entries.push(Subscription {
            subscriber: id,
            callback,
        });
        Ok(())
    }

    pub fn unregister_state_changed(&self, id: StorageId, callback: &StateChangedCallback) {
        let mut lists = self.lock();
        let Some(index) = lists.state_changed.position(id, callback) else {
            debug!("State callback for storage {} is not registered", id);
            return;
        };

        lists.state_changed.entries.remove(index);
        let watch = if lists.state_changed.entries.is_empty() {
            lists.state_changed.watch.take()
        } else {
            None
        };
        drop(lists);

        if let Some(watch) = watch {
            info!("Disarming {:?} subscription", CallbackKind::StateChanged);
            watch.cancel();
        }
    }

    pub fn register_device_changed(
        &self,
        kind: StorageKind,
        callback: DeviceChangedCallback,
    ) -> Result<(), StorageError> {
        let mut lists = self.lock();
        if lists.device_changed.watch.is_none() {
            lists.device_changed.watch = Some(self.arm(CallbackKind::DeviceChanged)?);
        }

        if lists.device_changed.position(kind, &callback).is_some() {
            debug!("Device callback for {} storage is already registered", kind);
            return Ok(());
        }

        lists.device_changed.entries.push(Subscription {
            subscriber: kind,
            callback,
        });
        Ok(())
    }

    pub fn unregister_device_changed(&self, kind: StorageKind, callback: &DeviceChangedCallback) {
        let mut lists = self.lock();
        let Some(index) = lists.device_changed.position(kind, callback) else {
            debug!("Device callback for {} storage is not registered", kind);
            return;
        };

        lists.device_changed.entries.remove(index);
        let watch = if lists.device_changed.entries.is_empty() {
            lists.device_changed.watch.take()
        } else {
            None
        };
        drop(lists);

        if let Some(watch) = watch {
            info!("Disarming {:?} subscription", CallbackKind::DeviceChanged);
            watch.cancel();
        }
    }

    pub fn subscriber_count(&self, kind: CallbackKind) -> usize {
        let lists = self.lock();
        match kind {
            CallbackKind::StateChanged => lists.state_changed.entries.len(),
            CallbackKind::DeviceChanged => lists.device_changed.entries.len(),
        }
    }

    pub fn is_armed(&self, kind: CallbackKind) -> bool {
        let lists = self.lock();
        match kind {
            CallbackKind::StateChanged => lists.state_changed.watch.is_some(),
            CallbackKind::DeviceChanged => lists.device_changed.watch.is_some(),
        }
    }

    fn arm(&self, kind: CallbackKind) -> Result<DeviceWatch, StorageError> {
        let lists = Arc::downgrade(&self.lists);
        let watch = self
            .manager
            .watch(Arc::new(move |event| dispatch(&lists, kind, event)))
            .map_err(|e| {
                warn!("Failed to arm {:?} subscription: {}", kind, e);
                StorageError::permission_denied(format!("cannot subscribe to device changes: {e}"))
            })?;

        info!("Armed {:?} subscription", kind);
        Ok(watch)
    }

    fn lock(&self) -> MutexGuard<'_, Lists> {
        lock_lists(&self.lists)
    }
}

impl std::fmt::Debug for CallbackRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CallbackRegistry")
            .field(
                "state_changed",
                &self.subscriber_count(CallbackKind::StateChanged),
            )
            .field(
                "device_changed",
                &self.subscriber_count(CallbackKind::DeviceChanged),
            )
            .finish()
    }
}

fn lock_lists(lists: &Mutex<Lists>) -> MutexGuard<'_, Lists> {
    // A panicking callback never runs under this lock, so the lists are
    // consistent even when poisoned.
    lists.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn dispatch(lists: &Weak<Mutex<Lists>>, kind: CallbackKind, event: DeviceEvent) {
    let Some(lists) = lists.upgrade() else {
        return;
    };

    let device = &event.device;
    let state = ExternalDeviceResolver::translate_state(device, event.kind);
    debug!(
        "{:?} for storage {} ({}): {}",
        event.kind, device.storage_id, device.devnode, state
    );

    match kind {
        CallbackKind::StateChanged => {
            let targets = lock_lists(&lists).state_changed.matching(device.storage_id);
            for callback in targets {
                invoke(kind, || callback(device.storage_id, state));
            }
        }
        CallbackKind::DeviceChanged => {
            let targets = lock_lists(&lists)
                .device_changed
                .matching(StorageKind::External);
            let change = DeviceChange::new(device, state);
            for callback in targets {
                invoke(kind, || callback(&change));
            }
        }
    }
}

/// Run one subscriber; a panic is logged and delivery continues
fn invoke(kind: CallbackKind, callback: impl FnOnce()) {
    if panic::catch_unwind(AssertUnwindSafe(callback)).is_err() {
        warn!("A {:?} callback panicked", kind);
    }
}
