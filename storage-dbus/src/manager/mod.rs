// SPDX-License-Identifier: GPL-3.0-only

//! Device manager access
//!
//! - [`BlockManagerProxy`] for the raw D-Bus interface
//! - [`DevicedBlockManager`] as the blocking [`storage_contracts::DeviceManager`]

pub mod block_manager;

pub use block_manager::*;
