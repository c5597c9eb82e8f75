// SPDX-License-Identifier: GPL-3.0-only

use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use storage_contracts::{FilesystemStats, FsStat};

#[derive(Debug, Default)]
struct State {
    stats: HashMap<PathBuf, FsStat>,
    queries: Vec<PathBuf>,
}

/// Filesystem statistics served from a path table
///
/// Paths without an entry fail with `NotFound`, like `statvfs` on a missing
/// mount point.
#[derive(Debug, Clone, Default)]
pub struct FakeFilesystemStats {
    state: Arc<Mutex<State>>,
}

impl FakeFilesystemStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(self, path: impl Into<PathBuf>, stat: FsStat) -> Self {
        self.insert(path, stat);
        self
    }

    pub fn insert(&self, path: impl Into<PathBuf>, stat: FsStat) {
        self.lock().stats.insert(path.into(), stat);
    }

    pub fn remove(&self, path: &Path) {
        self.lock().stats.remove(path);
    }

    /// Every path passed to [`FilesystemStats::stat`], in call order
    pub fn queries(&self) -> Vec<PathBuf> {
        self.lock().queries.clone()
    }

    /// Build a stat whose block and fragment size are both `block_size`
    pub fn uniform(block_size: u64, blocks: u64, blocks_available: u64) -> FsStat {
        FsStat {
            block_size,
            fragment_size: block_size,
            blocks,
            blocks_free: blocks_available,
            blocks_available,
        }
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl FilesystemStats for FakeFilesystemStats {
    fn stat(&self, path: &Path) -> io::Result<FsStat> {
        let mut state = self.lock();
        state.queries.push(path.to_path_buf());
        state.stats.get(path).copied().ok_or_else(|| {
            io::Error::new(io::ErrorKind::NotFound, format!("{} is not mounted", path.display()))
        })
    }
}
