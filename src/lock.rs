// Copyright (c) 2024-present, caskdb contributors
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

//! An advisory, process-exclusive lock over a data directory, so two engine
//! instances never open the same directory concurrently.

use fs4::FileExt;
use std::{
    fs::{File, OpenOptions},
    path::Path,
};

use crate::error::{Error, Result};

/// Holds the directory lock for as long as it is alive; the lock is released
/// when this value is dropped.
pub struct DirectoryLock {
    file: File,
}

impl DirectoryLock {
    /// Attempts to take out an exclusive lock on `<directory>/.cask.lock`.
    ///
    /// Returns [`Error::AlreadyOpen`] if another handle (in this process or
    /// another) already holds it.
    pub fn acquire(directory: &Path) -> Result<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .open(directory.join(".cask.lock"))?;

        file.try_lock_exclusive()
            .map_err(|_| Error::AlreadyOpen)?;

        Ok(Self { file })
    }
}

impl Drop for DirectoryLock {
    fn drop(&mut self) {
        let _ = FileExt::unlock(&self.file);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_log::test;

    #[test]
    fn second_lock_fails_while_first_is_held() {
        let dir = tempfile::tempdir().unwrap();
        let first = DirectoryLock::acquire(dir.path()).unwrap();
        assert!(matches!(
            DirectoryLock::acquire(dir.path()),
            Err(Error::AlreadyOpen)
        ));
        drop(first);
        assert!(DirectoryLock::acquire(dir.path()).is_ok());
    }
}
