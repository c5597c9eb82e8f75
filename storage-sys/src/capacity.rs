// SPDX-License-Identifier: GPL-3.0-only

//! Reserved-space deduction for internal storage

use std::path::PathBuf;
use std::sync::OnceLock;

use storage_contracts::FsStat;
use storage_types::Space;
use tracing::{info, warn};

use crate::reserve::StorageReserveConfig;

/// Subtracts a configured reserve from the available space of internal
/// storage
///
/// The reserve is computed on the first [`CapacityPolicy::apply`] and kept
/// for the lifetime of the policy. A failed configuration load leaves the
/// reserve at zero and is not retried; later edits to the file are ignored.
#[derive(Debug)]
pub struct CapacityPolicy {
    config_path: PathBuf,
    reserve_blocks: OnceLock<u64>,
}

impl CapacityPolicy {
    pub fn new(config_path: impl Into<PathBuf>) -> Self {
        Self {
            config_path: config_path.into(),
            reserve_blocks: OnceLock::new(),
        }
    }

    pub fn is_computed(&self) -> bool {
        self.reserve_blocks.get().is_some()
    }

    /// Reserve in blocks, `None` until the first capacity query
    pub fn reserve_blocks(&self) -> Option<u64> {
        self.reserve_blocks.get().copied()
    }

    /// Compute the reserve from `stat` unless it is already known
    pub fn ensure_computed(&self, stat: &FsStat) -> u64 {
        *self
            .reserve_blocks
            .get_or_init(|| self.compute_reserve_blocks(stat))
    }

    pub fn apply(&self, stat: &FsStat) -> Space {
        let reserve = self.ensure_computed(stat);
        let available_blocks = stat.blocks_available.saturating_sub(reserve);

        let total = stat.total_bytes();
        let available = stat.block_size.saturating_mul(available_blocks).min(total);
        Space::new(total, available)
    }

    fn compute_reserve_blocks(&self, stat: &FsStat) -> u64 {
        let total = stat.total_bytes();

        let config = match StorageReserveConfig::load(&self.config_path) {
            Ok(config) => config,
            Err(e) => {
                warn!("Failed to load {:?}, using default reserve: {}", self.config_path, e);
                return 0;
            }
        };

        let reserved = config.reserved_bytes(total);
        info!(
            "total {} check {:?} reserved {}",
            total, config.check_size, reserved
        );

        if stat.block_size == 0 {
            return 0;
        }
        reserved / stat.block_size
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    fn stat(blocks: u64, available: u64) -> FsStat {
        FsStat {
            block_size: 1024,
            fragment_size: 1024,
            blocks,
            blocks_free: available,
            blocks_available: available,
        }
    }

    fn config_file(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        file.write_all(content.as_bytes()).expect("write config");
        file
    }

    #[test]
    fn deducts_reserve_in_blocks() {
        let file = config_file("[STORAGE]\nCHECK_SIZE=1\nRESERVE=10240\n");
        let policy = CapacityPolicy::new(file.path());

        let space = policy.apply(&stat(100, 50));
        assert_eq!(policy.reserve_blocks(), Some(10));
        assert_eq!(space.total, 100 * 1024);
        assert_eq!(space.available, 40 * 1024);
    }

    #[test]
    fn small_filesystems_use_lite_reserve() {
        let file = config_file("[STORAGE]\nCHECK_SIZE=1048576\nRESERVE=102400\nRESERVE_LITE=2048\n");
        let policy = CapacityPolicy::new(file.path());

        let space = policy.apply(&stat(100, 50));
        assert_eq!(policy.reserve_blocks(), Some(2));
        assert_eq!(space.available, 48 * 1024);
    }

    #[test]
    fn clamps_to_zero_when_reserve_exceeds_availability() {
        let file = config_file("[STORAGE]\nCHECK_SIZE=1\nRESERVE=1048576\n");
        let policy = CapacityPolicy::new(file.path());

        let space = policy.apply(&stat(2000, 50));
        assert_eq!(space.available, 0);
        assert!(space.available <= space.total);
    }

    #[test]
    fn reserve_is_never_reread() {
        let file = config_file("[STORAGE]\nCHECK_SIZE=1\nRESERVE=10240\n");
        let policy = CapacityPolicy::new(file.path());
        assert!(!policy.is_computed());

        policy.apply(&stat(100, 50));
        std::fs::write(file.path(), "[STORAGE]\nCHECK_SIZE=1\nRESERVE=0\n")
            .expect("rewrite config");

        let space = policy.apply(&stat(100, 50));
        assert_eq!(policy.reserve_blocks(), Some(10));
        assert_eq!(space.available, 40 * 1024);
    }

    #[test]
    fn failed_load_keeps_zero_reserve_for_good() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("libstorage.conf");
        let policy = CapacityPolicy::new(&path);

        let space = policy.apply(&stat(100, 50));
        assert_eq!(policy.reserve_blocks(), Some(0));
        assert_eq!(space.available, 50 * 1024);

        std::fs::write(&path, "[STORAGE]\nCHECK_SIZE=1\nRESERVE=10240\n").expect("write config");
        let space = policy.apply(&stat(100, 50));
        assert_eq!(space.available, 50 * 1024);
    }
}
