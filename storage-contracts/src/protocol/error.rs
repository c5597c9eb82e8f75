// SPDX-License-Identifier: GPL-3.0-only

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::traits::{DeviceManagerError, SettingsError};

/// Failure classes visible on the public query surface
///
/// `NotSupported`: the id or category has no meaning for the owning backend.
/// `NoSuchDevice`: the class is valid but the specific device is gone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StorageErrorKind {
    InvalidParameter,
    NotSupported,
    OutOfMemory,
    OperationFailed,
    NoSuchDevice,
    PermissionDenied,
    Io,
}

impl StorageErrorKind {
    /// Negative errno-style code for callers that speak integers
    pub fn code(self) -> i32 {
        match self {
            Self::InvalidParameter => -libc::EINVAL,
            Self::NotSupported => -libc::ENOTSUP,
            Self::OutOfMemory => -libc::ENOMEM,
            Self::OperationFailed => -libc::EPERM,
            Self::NoSuchDevice => -libc::ENODEV,
            Self::PermissionDenied => -libc::EACCES,
            Self::Io => -libc::EIO,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("{kind:?}: {message}")]
pub struct StorageError {
    pub kind: StorageErrorKind,
    pub message: String,
}

impl StorageError {
    pub fn new(kind: StorageErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn invalid_parameter(message: impl Into<String>) -> Self {
        Self::new(StorageErrorKind::InvalidParameter, message)
    }

    pub fn not_supported(message: impl Into<String>) -> Self {
        Self::new(StorageErrorKind::NotSupported, message)
    }

    pub fn no_such_device(message: impl Into<String>) -> Self {
        Self::new(StorageErrorKind::NoSuchDevice, message)
    }

    pub fn operation_failed(message: impl Into<String>) -> Self {
        Self::new(StorageErrorKind::OperationFailed, message)
    }

    pub fn permission_denied(message: impl Into<String>) -> Self {
        Self::new(StorageErrorKind::PermissionDenied, message)
    }

    pub fn io(message: impl Into<String>) -> Self {
        Self::new(StorageErrorKind::Io, message)
    }

    pub fn code(&self) -> i32 {
        self.kind.code()
    }

    /// Collapse collaborator failures into `OperationFailed`
    ///
    /// Validation and resolution outcomes keep their identity so callers can
    /// tell "no such concept" and "no such device" apart from "it failed".
    pub fn normalized(self) -> Self {
        match self.kind {
            StorageErrorKind::InvalidParameter
            | StorageErrorKind::NotSupported
            | StorageErrorKind::NoSuchDevice
            | StorageErrorKind::OperationFailed => self,
            StorageErrorKind::OutOfMemory
            | StorageErrorKind::PermissionDenied
            | StorageErrorKind::Io => Self {
                kind: StorageErrorKind::OperationFailed,
                message: self.message,
            },
        }
    }
}

impl From<DeviceManagerError> for StorageError {
    fn from(err: DeviceManagerError) -> Self {
        match err {
            DeviceManagerError::Subscribe(_) => Self::permission_denied(err.to_string()),
            _ => Self::io(err.to_string()),
        }
    }
}

impl From<SettingsError> for StorageError {
    fn from(err: SettingsError) -> Self {
        Self::operation_failed(err.to_string())
    }
}
