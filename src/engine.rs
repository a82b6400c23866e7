// Copyright (c) 2024-present, caskdb contributors
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

//! The public façade: a single `RwLock` coordinating the key directory and
//! the segment manager. `Get` takes the lock shared; every other operation
//! takes it exclusively. There is no finer-grained locking — the hot path
//! is dominated by I/O, not contention on this structure.

use std::sync::{Arc, RwLock};

use crate::{
    cipher::Cipher,
    coding::Encode,
    compaction,
    config::EngineOptions,
    error::{Error, Result},
    hash::fingerprint,
    id::IdAllocator,
    keydir::KeyDirectory,
    lock::DirectoryLock,
    locator::Locator,
    record::Record,
    recovery::{self, now_secs, verify_record},
    segment::{index_snapshot_path, manager::SegmentManager, INDEX_DIRNAME},
};

struct EngineState {
    /// `None` once [`Engine::close`] has run.
    manager: Option<SegmentManager>,
    keydir: KeyDirectory,
    lock: Option<DirectoryLock>,
}

struct EngineInner {
    state: RwLock<EngineState>,
    cipher: Cipher,
    #[allow(dead_code)]
    id_allocator: Arc<IdAllocator>,
}

/// An open handle to a Bitcask-style data directory.
///
/// Cheap to clone: internally an `Arc`, so multiple handles share the same
/// underlying engine state.
#[derive(Clone)]
pub struct Engine(Arc<EngineInner>);

impl Engine {
    /// Opens (creating if necessary) the data directory described by
    /// `options`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] if the options are invalid,
    /// [`Error::AlreadyOpen`] if another live handle holds the directory
    /// lock, or [`Error::Corruption`]/[`Error::Io`] if recovery fails.
    pub fn open(options: EngineOptions) -> Result<Self> {
        options.validate()?;

        let lock = DirectoryLock::acquire(&options.directory)?;
        let cipher = options.build_cipher()?;
        log::debug!("encryption enabled: {}", cipher.is_encrypting());

        let exists = options.directory.join(".cask").exists();

        let (manager, keydir, id_allocator) = if exists {
            log::info!("recovering store at {}", options.directory.display());
            recovery::recover(&options)?
        } else {
            log::info!("creating new store at {}", options.directory.display());
            recovery::create_new(&options)?
        };

        Ok(Self(Arc::new(EngineInner {
            state: RwLock::new(EngineState {
                manager: Some(manager),
                keydir,
                lock: Some(lock),
            }),
            cipher,
            id_allocator,
        })))
    }

    /// Writes `value` under `key`, optionally expiring after `ttl_seconds`.
    pub fn put(&self, key: &[u8], value: &[u8], ttl_seconds: Option<u32>) -> Result<()> {
        let mut state = self.0.state.write().expect("lock poisoned");
        let manager = state.manager.as_mut().ok_or(Error::AlreadyClosed)?;

        let now = now_secs();
        let sealed_value = self.0.cipher.seal(value)?;

        let record = Record {
            timestamp: u64::from(now),
            key: key.to_vec(),
            value: sealed_value,
        };
        let frame = record.encode_into_vec()?;

        log::trace!("put {} bytes (key {} bytes)", frame.len(), key.len());
        let (segment_id, offset, size) = manager.append(&frame)?;

        let expire_ts = ttl_seconds.map_or(0, |ttl| now.saturating_add(ttl));
        state.keydir.insert(
            fingerprint(key),
            Locator {
                segment_id,
                offset,
                size,
                create_ts: now,
                expire_ts,
            },
        );

        Ok(())
    }

    /// Reads the current value for `key`.
    ///
    /// # Errors
    ///
    /// [`Error::NotFound`] if the key has never been written or has been
    /// removed, [`Error::Expired`] if its TTL has elapsed, or
    /// [`Error::Corruption`] if the stored frame fails its checksum.
    pub fn get(&self, key: &[u8]) -> Result<Vec<u8>> {
        let state = self.0.state.read().expect("lock poisoned");
        let manager = state.manager.as_ref().ok_or(Error::AlreadyClosed)?;

        let locator = state.keydir.get(fingerprint(key)).ok_or(Error::NotFound)?;

        if !locator.is_live_at(now_secs()) {
            return Err(Error::Expired);
        }

        let bytes = manager.read_at(locator.segment_id, locator.offset, locator.size)?;
        let record = verify_record(&bytes)?;

        self.0.cipher.open(&record.value)
    }

    /// Deletes `key`, if present. A no-op if it is already absent.
    ///
    /// Space is not reclaimed until the next [`Engine::compact`]: this only
    /// removes the in-memory directory entry, it does not append anything
    /// to the log.
    pub fn remove(&self, key: &[u8]) -> Result<()> {
        let mut state = self.0.state.write().expect("lock poisoned");
        if state.manager.is_none() {
            return Err(Error::AlreadyClosed);
        }
        state.keydir.remove(fingerprint(key));
        Ok(())
    }

    /// Flushes, writes an index snapshot, and releases the directory lock.
    ///
    /// Any further operation on this (or a cloned) handle returns
    /// [`Error::AlreadyClosed`].
    pub fn close(&self) -> Result<()> {
        let mut state = self.0.state.write().expect("lock poisoned");
        let manager = state.manager.take().ok_or(Error::AlreadyClosed)?;

        manager.close_all()?;

        // Named after the active segment id at close time, not a freshly
        // minted one: recovery uses this id to know which segments are
        // already fully reflected in the snapshot and which (ids greater
        // than this) still need to be replayed from disk.
        let snapshot_id = manager.active_id();
        std::fs::create_dir_all(manager.directory().join(INDEX_DIRNAME))?;
        crate::snapshot::write_snapshot(
            &index_snapshot_path(manager.directory(), snapshot_id),
            &state.keydir,
            now_secs(),
        )?;

        state.lock.take();

        log::info!("store closed");
        Ok(())
    }

    /// Rewrites every live record into fresh segments and discards stale
    /// ones. Normally triggered automatically during recovery once the
    /// store's total size crosses the configured threshold; exposed here so
    /// callers can also trigger it explicitly.
    pub fn compact(&self) -> Result<()> {
        let mut state = self.0.state.write().expect("lock poisoned");
        let state = &mut *state;
        let manager = state.manager.as_mut().ok_or(Error::AlreadyClosed)?;
        compaction::compact(manager, &mut state.keydir)
    }

    /// Total bytes currently occupied by data segments.
    pub fn total_data_bytes(&self) -> Result<u64> {
        let state = self.0.state.read().expect("lock poisoned");
        let manager = state.manager.as_ref().ok_or(Error::AlreadyClosed)?;
        manager.total_size()
    }

    /// Number of live keys in the directory.
    pub fn len(&self) -> Result<usize> {
        let state = self.0.state.read().expect("lock poisoned");
        if state.manager.is_none() {
            return Err(Error::AlreadyClosed);
        }
        Ok(state.keydir.len())
    }

    /// `true` if the engine holds no live keys.
    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }
}
