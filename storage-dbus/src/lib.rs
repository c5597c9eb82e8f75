// SPDX-License-Identifier: GPL-3.0-only

//! Block device manager client
//!
//! Talks to `org.tizen.system.deviced` on the system bus and exposes it as a
//! synchronous [`storage_contracts::DeviceManager`]. Method calls block the
//! calling thread; change signals are delivered on a dedicated thread.

pub mod manager;
pub mod record;

pub use manager::{BlockManagerProxy, DevicedBlockManager};
pub use record::{RawBlockDevice, decode_device};
