// SPDX-License-Identifier: GPL-3.0-only

//! Storage information service
//!
//! [`StorageRegistry`] is the single entry point. It owns an ordered list of
//! [`StorageProvider`]s and answers every query by storage id:
//!
//! - built-in providers (internal storage) own a fixed id
//! - the removable provider resolves any other id through the system device
//!   manager, and fans out its change notifications to subscribers
//!
//! All operations are synchronous and may block on the filesystem or the bus.

pub mod backend;
pub mod callbacks;
pub mod config;
pub mod registry;
pub mod resolver;

pub use backend::{InternalBackend, RemovableBackend, StorageProvider};
pub use callbacks::{CallbackKind, CallbackRegistry, DeviceChangedCallback, StateChangedCallback};
pub use config::{ConfigError, StorageConfig};
pub use registry::{StorageRegistry, StorageRegistryBuilder};
pub use resolver::ExternalDeviceResolver;

pub use storage_contracts::{StorageError, StorageErrorKind};
pub use storage_types::{
    DeviceChange, DirectoryCategory, Space, StorageId, StorageInfo, StorageKind, StorageState,
};
