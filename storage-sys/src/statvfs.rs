// SPDX-License-Identifier: GPL-3.0-only

use std::io;
use std::path::Path;

use nix::sys::statvfs::statvfs;
use storage_contracts::{FilesystemStats, FsStat};

/// [`FilesystemStats`] backed by `statvfs(3)`
#[derive(Debug, Clone, Copy, Default)]
pub struct Statvfs;

impl FilesystemStats for Statvfs {
    fn stat(&self, path: &Path) -> io::Result<FsStat> {
        let stat = statvfs(path).map_err(io::Error::from)?;

        Ok(FsStat {
            block_size: stat.block_size() as u64,
            fragment_size: stat.fragment_size() as u64,
            blocks: stat.blocks() as u64,
            blocks_free: stat.blocks_free() as u64,
            blocks_available: stat.blocks_available() as u64,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stats_the_root_filesystem() {
        let stat = Statvfs.stat(Path::new("/")).expect("statvfs on /");
        assert!(stat.block_size > 0);
        assert!(stat.blocks_available <= stat.blocks);
    }

    #[test]
    fn missing_path_reports_os_error() {
        let err = Statvfs
            .stat(Path::new("/definitely/not/a/mount/point"))
            .expect_err("missing path");
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }
}
