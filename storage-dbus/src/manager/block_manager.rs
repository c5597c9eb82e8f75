// SPDX-License-Identifier: GPL-3.0-only

use std::sync::mpsc;

use futures_util::StreamExt;
use futures_util::stream::{self, BoxStream};
use storage_contracts::{DeviceEventHandler, DeviceManager, DeviceManagerError, DeviceWatch};
use storage_types::{DeviceEvent, DeviceEventKind, DeviceRecord, StorageId};
use tokio::runtime::Runtime;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use zbus::Connection;
use zbus::message::Message;
use zbus_macros::proxy;

use crate::record::{RawBlockDevice, decode_device};

#[proxy(
    default_service = "org.tizen.system.deviced",
    default_path = "/Org/Tizen/System/DeviceD/Block/Manager",
    interface = "org.tizen.system.deviced.BlockManager"
)]
pub trait BlockManager {
    /// `device_type` is "all", "scsi" or "mmc"
    fn get_device_list(&self, device_type: &str) -> zbus::Result<Vec<RawBlockDevice>>;

    fn get_device_info(&self, storage_id: i32) -> zbus::Result<RawBlockDevice>;

    fn get_mmc_primary(&self) -> zbus::Result<RawBlockDevice>;
}

/// Signals carrying one device record each
const CHANGE_SIGNALS: [(&str, DeviceEventKind); 3] = [
    ("ObjectAdded", DeviceEventKind::Added),
    ("ObjectRemoved", DeviceEventKind::Removed),
    ("DeviceChanged", DeviceEventKind::Changed),
];

/// Blocking client for the deviced block manager
///
/// Owns a small tokio runtime that drives the bus connection. Calls must not
/// be made from inside another tokio runtime.
pub struct DevicedBlockManager {
    runtime: Runtime,
    proxy: BlockManagerProxy<'static>,
}

impl DevicedBlockManager {
    /// Connect to the system bus
    pub fn new() -> Result<Self, DeviceManagerError> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .thread_name("storage-dbus")
            .enable_all()
            .build()
            .map_err(|e| DeviceManagerError::Connection(format!("runtime: {e}")))?;

        let proxy = runtime
            .block_on(async {
                let connection = Connection::system().await?;
                BlockManagerProxy::new(&connection).await
            })
            .map_err(|e| {
                DeviceManagerError::Connection(format!("Failed to connect to system bus: {e}"))
            })?;

        info!("Connected to block device manager");
        Ok(Self { runtime, proxy })
    }

    fn call_failed(method: &str, err: zbus::Error) -> DeviceManagerError {
        warn!("{} call failed: {}", method, err);
        DeviceManagerError::Call {
            method: method.to_string(),
            message: err.to_string(),
        }
    }
}

impl DeviceManager for DevicedBlockManager {
    fn list_devices(&self) -> Result<Vec<DeviceRecord>, DeviceManagerError> {
        let raw = self
            .runtime
            .block_on(self.proxy.get_device_list("all"))
            .map_err(|e| Self::call_failed("GetDeviceList", e))?;

        debug!("Device manager reported {} devices", raw.len());
        raw.into_iter().map(decode_device).collect()
    }

    fn device_info(&self, id: StorageId) -> Result<DeviceRecord, DeviceManagerError> {
        let raw = self
            .runtime
            .block_on(self.proxy.get_device_info(id.get()))
            .map_err(|e| Self::call_failed("GetDeviceInfo", e))?;
        decode_device(raw)
    }

    fn primary_sdcard(&self) -> Result<DeviceRecord, DeviceManagerError> {
        let raw = self
            .runtime
            .block_on(self.proxy.get_mmc_primary())
            .map_err(|e| Self::call_failed("GetMmcPrimary", e))?;
        decode_device(raw)
    }

    fn watch(&self, handler: DeviceEventHandler) -> Result<DeviceWatch, DeviceManagerError> {
        let streams = self
            .runtime
            .block_on(async {
                let mut streams: Vec<BoxStream<'static, (DeviceEventKind, Message)>> =
                    Vec::with_capacity(CHANGE_SIGNALS.len());
                for (signal, kind) in CHANGE_SIGNALS {
                    let signals = self.proxy.inner().receive_signal(signal).await?;
                    streams.push(signals.map(move |message| (kind, message)).boxed());
                }
                Ok::<_, zbus::Error>(streams)
            })
            .map_err(|e| DeviceManagerError::Subscribe(e.to_string()))?;

        let token = CancellationToken::new();
        let (sender, receiver) = mpsc::channel::<DeviceEvent>();

        let cancelled = token.clone();
        self.runtime.spawn(async move {
            let mut signals = stream::select_all(streams);
            loop {
                tokio::select! {
                    _ = cancelled.cancelled() => break,
                    next = signals.next() => {
                        let Some((kind, message)) = next else {
                            break;
                        };

                        match message.body().deserialize::<RawBlockDevice>() {
                            Ok(raw) => match decode_device(raw) {
                                Ok(device) => {
                                    if sender.send(DeviceEvent { kind, device }).is_err() {
                                        break;
                                    }
                                }
                                Err(e) => warn!("Dropping {:?} event: {}", kind, e),
                            },
                            Err(e) => warn!("Failed to parse {:?} signal: {}", kind, e),
                        }
                    }
                }
            }
            debug!("Device change watch stopped");
        });

        // Handlers run off the runtime so they may call back into this client.
        let watch = DeviceWatch::new(move || token.cancel());
        std::thread::Builder::new()
            .name("storage-device-events".to_string())
            .spawn(move || {
                for event in receiver {
                    handler(event);
                }
            })
            .map_err(|e| DeviceManagerError::Subscribe(format!("event thread: {e}")))?;

        info!("Watching block device changes");
        Ok(watch)
    }
}

impl std::fmt::Debug for DevicedBlockManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DevicedBlockManager")
            .field("destination", &self.proxy.inner().destination())
            .field("path", &self.proxy.inner().path())
            .finish()
    }
}
