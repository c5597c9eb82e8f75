// SPDX-License-Identifier: GPL-3.0-only

//! The public query surface

use std::ops::ControlFlow;
use std::path::PathBuf;
use std::sync::Arc;

use storage_contracts::{StorageError, StorageErrorKind};
use storage_dbus::DevicedBlockManager;
use storage_sys::{CapacityPolicy, Statvfs, VconfSettings};
use storage_types::{DirectoryCategory, Space, StorageId, StorageInfo, StorageKind, StorageState};
use tracing::{debug, info, warn};

use crate::backend::{InternalBackend, RemovableBackend, StorageProvider};
use crate::callbacks::{DeviceChangedCallback, StateChangedCallback};
use crate::config::{ConfigError, StorageConfig};

/// Assembles the ordered provider list of a [`StorageRegistry`]
#[derive(Default)]
pub struct StorageRegistryBuilder {
    providers: Vec<Box<dyn StorageProvider>>,
}

impl StorageRegistryBuilder {
    pub fn provider(mut self, provider: impl StorageProvider + 'static) -> Self {
        self.providers.push(Box::new(provider));
        self
    }

    pub fn build(self) -> StorageRegistry {
        let fixed: Vec<_> = self
            .providers
            .iter()
            .filter_map(|provider| provider.fixed_id())
            .collect();
        for (index, id) in fixed.iter().enumerate() {
            if fixed[..index].contains(id) {
                warn!("Storage id {} is claimed twice, the first provider wins", id);
            }
        }

        StorageRegistry {
            providers: self.providers,
            fixed_ids: fixed,
        }
    }
}

/// Every storage on the device, addressed by [`StorageId`]
///
/// Built-in providers answer for their fixed id first; any other id goes to
/// the first provider that resolves ids dynamically. Without such a provider
/// only built-in storage exists and every other id is `NotSupported`.
/// A removable device reporting an id owned by a built-in provider is
/// shadowed: it is neither enumerated nor reachable by id.
///
/// Collaborator failures are logged and reported as `OperationFailed`;
/// `InvalidParameter`, `NotSupported` and `NoSuchDevice` reach the caller
/// unchanged.
pub struct StorageRegistry {
    providers: Vec<Box<dyn StorageProvider>>,
    fixed_ids: Vec<StorageId>,
}

impl StorageRegistry {
    pub fn builder() -> StorageRegistryBuilder {
        StorageRegistryBuilder::default()
    }

    /// Production registry configured from
    /// [`DEFAULT_CONFIG_PATH`](crate::config::DEFAULT_CONFIG_PATH)
    pub fn open() -> Result<Self, ConfigError> {
        let config = StorageConfig::load_default()?;
        Ok(Self::from_config(&config))
    }

    /// Production providers: internal storage, then removable media when
    /// enabled and the device manager is reachable
    pub fn from_config(config: &StorageConfig) -> Self {
        let stats = Arc::new(Statvfs);
        let internal = &config.internal;

        let mut builder = Self::builder().provider(InternalBackend::new(
            internal.id,
            &internal.root,
            &internal.stat_path,
            stats.clone(),
            CapacityPolicy::new(&internal.reserve_config),
            Arc::new(VconfSettings::new(internal.ringtone_key.as_str())),
        ));

        if config.removable.enabled {
            match DevicedBlockManager::new() {
                Ok(manager) => {
                    builder = builder.provider(RemovableBackend::new(Arc::new(manager), stats));
                }
                Err(e) => {
                    warn!("Removable storage is not supported: {}", e);
                }
            }
        } else {
            info!("Removable storage disabled by configuration");
        }

        builder.build()
    }

    /// Visit every storage: built-in providers in registration order, then
    /// each present removable device in device manager order
    ///
    /// A provider that fails to list is logged and skipped. Every id is
    /// visited at most once.
    pub fn enumerate<F>(&self, mut visitor: F)
    where
        F: FnMut(&StorageInfo) -> ControlFlow<()>,
    {
        let builtin = self.providers.iter().filter(|p| p.fixed_id().is_some());
        let dynamic = self.providers.iter().filter(|p| p.fixed_id().is_none());

        let mut visited = Vec::new();
        for provider in builtin.chain(dynamic) {
            let storages = match provider.list() {
                Ok(storages) => storages,
                Err(e) => {
                    warn!("Failed to list {} storage: {}", provider.kind(), e);
                    continue;
                }
            };

            let is_dynamic = provider.fixed_id().is_none();
            for storage in &storages {
                if visited.contains(&storage.id) || (is_dynamic && self.is_fixed(storage.id)) {
                    warn!(
                        "Skipping {} storage {} at {:?}: id already in use",
                        storage.kind, storage.id, storage.root
                    );
                    continue;
                }
                visited.push(storage.id);

                if visitor(storage).is_break() {
                    return;
                }
            }
        }
    }

    pub fn storages(&self) -> Vec<StorageInfo> {
        let mut storages = Vec::new();
        self.enumerate(|storage| {
            storages.push(storage.clone());
            ControlFlow::Continue(())
        });
        storages
    }

    pub fn get_root(&self, id: StorageId) -> Result<PathBuf, StorageError> {
        let provider = self.provider(id)?;
        finish("get_root", id, provider.root(id))
    }

    pub fn get_directory(
        &self,
        id: StorageId,
        category: DirectoryCategory,
    ) -> Result<PathBuf, StorageError> {
        let provider = self.provider(id)?;

        let result = match category.subpath() {
            Some(subpath) => provider.root(id).map(|root| root.join(subpath)),
            None => provider.ringtones_directory(id),
        };
        finish("get_directory", id, result)
    }

    /// Like [`StorageRegistry::get_directory`] for a raw category value
    pub fn get_directory_raw(&self, id: StorageId, category: i32) -> Result<PathBuf, StorageError> {
        let category = DirectoryCategory::try_from(category).map_err(|raw| {
            StorageError::invalid_parameter(format!("unknown directory category {raw}"))
        })?;
        self.get_directory(id, category)
    }

    pub fn get_type(&self, id: StorageId) -> Result<StorageKind, StorageError> {
        let provider = self.provider(id)?;
        if provider.fixed_id().is_some() {
            return Ok(provider.kind());
        }

        // Dynamic ids only have a kind while they resolve
        let result = provider.state(id).map(|_| provider.kind());
        finish("get_type", id, result)
    }

    pub fn get_state(&self, id: StorageId) -> Result<StorageState, StorageError> {
        let provider = self.provider(id)?;
        finish("get_state", id, provider.state(id))
    }

    pub fn get_space(&self, id: StorageId) -> Result<Space, StorageError> {
        let provider = self.provider(id)?;
        finish("get_space", id, provider.space(id))
    }

    pub fn get_total_space(&self, id: StorageId) -> Result<u64, StorageError> {
        self.get_space(id).map(|space| space.total)
    }

    pub fn get_available_space(&self, id: StorageId) -> Result<u64, StorageError> {
        self.get_space(id).map(|space| space.available)
    }

    /// Subscribe to mount state changes of `id`
    ///
    /// Internal storage never changes state; the call succeeds without
    /// storing anything.
    pub fn set_state_changed(
        &self,
        id: StorageId,
        callback: StateChangedCallback,
    ) -> Result<(), StorageError> {
        let provider = self.provider(id)?;
        finish(
            "set_state_changed",
            id,
            provider.register_state_changed(id, callback),
        )
    }

    /// Remove a subscription made with [`StorageRegistry::set_state_changed`].
    /// Removing an absent subscription succeeds.
    pub fn unset_state_changed(
        &self,
        id: StorageId,
        callback: &StateChangedCallback,
    ) -> Result<(), StorageError> {
        let provider = self.provider(id)?;
        finish(
            "unset_state_changed",
            id,
            provider.unregister_state_changed(id, callback),
        )
    }

    /// Subscribe to device changes of every storage of `kind`
    pub fn set_changed(
        &self,
        kind: StorageKind,
        callback: DeviceChangedCallback,
    ) -> Result<(), StorageError> {
        let provider = self.provider_of_kind(kind)?;
        finish_kind("set_changed", kind, provider.register_device_changed(callback))
    }

    pub fn unset_changed(
        &self,
        kind: StorageKind,
        callback: &DeviceChangedCallback,
    ) -> Result<(), StorageError> {
        let provider = self.provider_of_kind(kind)?;
        finish_kind(
            "unset_changed",
            kind,
            provider.unregister_device_changed(callback),
        )
    }

    /// Id and mount point of the primary sdcard partition
    pub fn primary_sdcard(&self) -> Result<(StorageId, PathBuf), StorageError> {
        let provider = self.provider_of_kind(StorageKind::External)?;
        let result = provider.primary_sdcard().and_then(|(id, root)| {
            if self.is_fixed(id) {
                warn!("Primary sdcard reports id {} owned by built-in storage", id);
                return Err(StorageError::no_such_device(format!(
                    "sdcard id {id} collides with built-in storage"
                )));
            }
            Ok((id, root))
        });
        finish_kind("primary_sdcard", StorageKind::External, result)
    }

    fn is_fixed(&self, id: StorageId) -> bool {
        self.fixed_ids.contains(&id)
    }

    fn provider(&self, id: StorageId) -> Result<&dyn StorageProvider, StorageError> {
        if !id.is_valid() {
            return Err(StorageError::invalid_parameter(format!(
                "invalid storage id {id}"
            )));
        }

        // Built-in ids never reach the dynamic provider
        if let Some(provider) = self.providers.iter().find(|p| p.fixed_id() == Some(id)) {
            return Ok(provider.as_ref());
        }

        match self.providers.iter().find(|p| p.fixed_id().is_none()) {
            Some(provider) => Ok(provider.as_ref()),
            None => {
                debug!("Not supported storage: id {}", id);
                Err(StorageError::not_supported(format!(
                    "storage {id} is not supported"
                )))
            }
        }
    }

    fn provider_of_kind(&self, kind: StorageKind) -> Result<&dyn StorageProvider, StorageError> {
        if kind == StorageKind::Internal {
            return Err(StorageError::not_supported(
                "internal storage reports no device changes",
            ));
        }

        self.providers
            .iter()
            .find(|p| p.kind() == kind)
            .map(|p| p.as_ref())
            .ok_or_else(|| StorageError::not_supported(format!("{kind} storage is not supported")))
    }
}

impl std::fmt::Debug for StorageRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let kinds: Vec<_> = self.providers.iter().map(|p| p.kind()).collect();
        f.debug_struct("StorageRegistry")
            .field("providers", &kinds)
            .finish()
    }
}

fn finish<T>(
    operation: &str,
    id: StorageId,
    result: Result<T, StorageError>,
) -> Result<T, StorageError> {
    result.map_err(|e| {
        log_failure(operation, &format!("storage {id}"), &e);
        e.normalized()
    })
}

fn finish_kind<T>(
    operation: &str,
    kind: StorageKind,
    result: Result<T, StorageError>,
) -> Result<T, StorageError> {
    result.map_err(|e| {
        log_failure(operation, &format!("{kind} storage"), &e);
        e.normalized()
    })
}

fn log_failure(operation: &str, target: &str, error: &StorageError) {
    match error.kind {
        StorageErrorKind::InvalidParameter
        | StorageErrorKind::NotSupported
        | StorageErrorKind::NoSuchDevice => {
            debug!("{} for {}: {}", operation, target, error);
        }
        _ => {
            warn!(
                "{} failed for {} (code {}): {}",
                operation,
                target,
                error.code(),
                error
            );
        }
    }
}
