// SPDX-License-Identifier: GPL-3.0-only

//! Contract for the system block device manager

use std::fmt;
use std::sync::Arc;

use storage_types::{DeviceEvent, DeviceRecord, StorageId};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DeviceManagerError {
    #[error("device manager connection failed: {0}")]
    Connection(String),

    #[error("{method} call failed: {message}")]
    Call { method: String, message: String },

    #[error("malformed device record: {0}")]
    MalformedReply(String),

    #[error("device change subscription failed: {0}")]
    Subscribe(String),
}

/// Receives every device change while a [`DeviceWatch`] is alive
///
/// Invoked from the device manager's delivery thread, never from the thread
/// that armed the watch.
pub type DeviceEventHandler = Arc<dyn Fn(DeviceEvent) + Send + Sync>;

/// Remote block device manager
///
/// Every call is synchronous and may block on the bus. Returned records are
/// snapshots; callers must not assume a previous list is still valid after a
/// failed call.
pub trait DeviceManager: Send + Sync {
    fn list_devices(&self) -> Result<Vec<DeviceRecord>, DeviceManagerError>;

    /// Look up one device. The manager answers unknown ids with a record whose
    /// storage id is negative.
    fn device_info(&self, id: StorageId) -> Result<DeviceRecord, DeviceManagerError>;

    /// The primary partition of the inserted sdcard, negative storage id when
    /// none is inserted
    fn primary_sdcard(&self) -> Result<DeviceRecord, DeviceManagerError>;

    /// Start delivering change events to `handler` until the returned watch
    /// is dropped
    fn watch(&self, handler: DeviceEventHandler) -> Result<DeviceWatch, DeviceManagerError>;
}

/// Live upstream subscription; dropping it disarms the subscription
pub struct DeviceWatch {
    cancel: Option<Box<dyn FnOnce() + Send>>,
}

impl DeviceWatch {
    pub fn new(cancel: impl FnOnce() + Send + 'static) -> Self {
        Self {
            cancel: Some(Box::new(cancel)),
        }
    }

    pub fn cancel(mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl Drop for DeviceWatch {
    fn drop(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl fmt::Debug for DeviceWatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeviceWatch")
            .field("armed", &self.cancel.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    #[test]
    fn watch_cancels_exactly_once() {
        let cancelled = Arc::new(AtomicUsize::new(0));

        let counter = cancelled.clone();
        let watch = DeviceWatch::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        watch.cancel();
        assert_eq!(cancelled.load(Ordering::SeqCst), 1);

        let counter = cancelled.clone();
        drop(DeviceWatch::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        }));
        assert_eq!(cancelled.load(Ordering::SeqCst), 2);
    }
}
