// Copyright (c) 2024-present, caskdb contributors
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

use std::{
    io::Write,
    path::{Path, PathBuf},
    sync::atomic::{AtomicU64, Ordering},
};

/// Identifies a segment or index snapshot file.
#[allow(clippy::module_name_repetitions)]
pub type SegmentId = u64;

/// Atomically overwrites `path` with `content`, via write-to-temp-then-rename
/// in the same directory, so a crash mid-write never leaves a torn file.
fn rewrite_atomic<P: AsRef<Path>>(path: P, content: &[u8]) -> std::io::Result<()> {
    let path = path.as_ref();
    let folder = path.parent().expect("should have a parent");

    let mut temp_file = tempfile::NamedTempFile::new_in(folder)?;
    temp_file.write_all(content)?;
    temp_file.persist(path).map_err(|e| e.error)?;

    #[cfg(not(target_os = "windows"))]
    {
        let file = std::fs::File::open(path)?;
        file.sync_all()?;
    }

    Ok(())
}

/// Mints monotonically increasing segment IDs and persists the high-water
/// mark to disk so a restart never reuses an ID handed out before the crash.
///
/// Unix-seconds timestamps were rejected as IDs: two rotations inside the
/// same second would collide, violating the uniqueness segment IDs need.
#[allow(clippy::module_name_repetitions)]
pub struct IdAllocator {
    counter: AtomicU64,
    path: PathBuf,
}

impl IdAllocator {
    /// Opens (or creates) the counter file at `path`, starting from `start`
    /// if the file does not yet exist.
    pub fn open(path: PathBuf, start: u64) -> std::io::Result<Self> {
        let initial = match std::fs::read(&path) {
            Ok(bytes) if bytes.len() == 8 => {
                let mut buf = [0u8; 8];
                buf.copy_from_slice(&bytes);
                u64::from_le_bytes(buf).max(start)
            }
            Ok(_) | Err(_) => start,
        };

        let allocator = Self {
            counter: AtomicU64::new(initial),
            path,
        };
        allocator.persist(initial)?;
        Ok(allocator)
    }

    fn persist(&self, value: u64) -> std::io::Result<()> {
        rewrite_atomic(&self.path, &value.to_le_bytes())
    }

    /// Mints the next ID and durably persists the new high-water mark before
    /// returning it.
    pub fn next(&self) -> std::io::Result<SegmentId> {
        let id = self.counter.fetch_add(1, Ordering::SeqCst) + 1;
        self.persist(id)?;
        Ok(id)
    }

    /// Raises the counter to at least `floor`, without necessarily minting
    /// a new ID. Used during recovery once the highest on-disk segment ID is
    /// known.
    pub fn fast_forward(&self, floor: u64) -> std::io::Result<()> {
        let mut current = self.counter.load(Ordering::SeqCst);
        while floor > current {
            match self.counter.compare_exchange_weak(
                current,
                floor,
                Ordering::SeqCst,
                Ordering::SeqCst,
            ) {
                Ok(_) => {
                    self.persist(floor)?;
                    return Ok(());
                }
                Err(observed) => current = observed,
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_log::test;

    #[test]
    fn mints_increasing_ids() -> std::io::Result<()> {
        let dir = tempfile::tempdir()?;
        let allocator = IdAllocator::open(dir.path().join(".cask.id"), 0)?;
        assert_eq!(allocator.next()?, 1);
        assert_eq!(allocator.next()?, 2);
        assert_eq!(allocator.next()?, 3);
        Ok(())
    }

    #[test]
    fn survives_reopen() -> std::io::Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join(".cask.id");

        let allocator = IdAllocator::open(path.clone(), 0)?;
        allocator.next()?;
        allocator.next()?;

        let reopened = IdAllocator::open(path, 0)?;
        assert_eq!(reopened.next()?, 3);
        Ok(())
    }

    #[test]
    fn fast_forward_only_moves_up() -> std::io::Result<()> {
        let dir = tempfile::tempdir()?;
        let allocator = IdAllocator::open(dir.path().join(".cask.id"), 0)?;
        allocator.fast_forward(10)?;
        assert_eq!(allocator.next()?, 11);

        allocator.fast_forward(5)?;
        assert_eq!(allocator.next()?, 12);
        Ok(())
    }
}
