// SPDX-License-Identifier: GPL-3.0-only

//! Low-level system collaborators for the storage information service
//!
//! Everything here talks to the local system directly rather than through
//! the device manager:
//! - Filesystem statistics via `statvfs(3)`
//! - The reserved-space configuration file and the policy applying it
//! - User settings lookups through `vconftool`

pub mod capacity;
pub mod error;
pub mod reserve;
pub mod settings;
pub mod statvfs;

pub use capacity::CapacityPolicy;
pub use error::{Result, SysError};
pub use reserve::{ReserveConfigError, StorageReserveConfig};
pub use settings::VconfSettings;
pub use statvfs::Statvfs;
