// SPDX-License-Identifier: GPL-3.0-only

use std::io;
use std::path::Path;

/// Raw block counts of a mounted filesystem
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FsStat {
    pub block_size: u64,
    pub fragment_size: u64,
    pub blocks: u64,
    pub blocks_free: u64,
    /// Blocks available to unprivileged users
    pub blocks_available: u64,
}

impl FsStat {
    pub fn total_bytes(&self) -> u64 {
        self.fragment_size.saturating_mul(self.blocks)
    }

    pub fn available_bytes(&self) -> u64 {
        self.block_size.saturating_mul(self.blocks_available)
    }
}

/// Filesystem statistics for a path
pub trait FilesystemStats: Send + Sync {
    fn stat(&self, path: &Path) -> io::Result<FsStat>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn totals_use_fragment_size_and_available_uses_block_size() {
        let stat = FsStat {
            block_size: 4096,
            fragment_size: 1024,
            blocks: 100,
            blocks_free: 60,
            blocks_available: 50,
        };
        assert_eq!(stat.total_bytes(), 102_400);
        assert_eq!(stat.available_bytes(), 204_800);
    }
}
