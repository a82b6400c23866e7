// Copyright (c) 2024-present, caskdb contributors
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

//! Rewrites every live record into fresh segments and discards the old
//! ones, reclaiming the space held by overwritten and removed keys.
//!
//! The key directory already resolves one locator per fingerprint, so this
//! walks it directly rather than k-way merging sorted per-segment streams:
//! there is only ever one current location for a given key to reconcile.

use std::collections::HashSet;

use crate::{
    error::Result,
    hash::Fingerprint,
    keydir::KeyDirectory,
    locator::Locator,
    recovery::verify_record,
    segment::{data_segment_path, index_snapshot_path, manager::SegmentManager, INDEX_DIRNAME},
};

/// Runs one full compaction pass.
///
/// Not crash-atomic as a whole: if the process dies mid-compaction, the next
/// open sees a directory with both some already-deleted old segments and
/// some freshly written new ones, reconciled the same way any other crash
/// mid-run is (snapshot-or-scan recovery). Each individual step (append,
/// delete, rename) is itself atomic.
pub fn compact(manager: &mut SegmentManager, keydir: &mut KeyDirectory) -> Result<()> {
    log::info!("compaction starting, {} live keys", keydir.len());

    let old_ids: HashSet<_> = manager.segment_ids().into_iter().collect();

    // Always start from a fresh destination segment, never reuse whatever
    // happened to be active when compaction was triggered.
    manager.rotate()?;

    let live: Vec<(Fingerprint, Locator)> = keydir.iter().collect();

    for (fingerprint, old_locator) in live {
        let bytes = manager.read_at(old_locator.segment_id, old_locator.offset, old_locator.size)?;
        let record = verify_record(&bytes)?;

        let frame = crate::coding::Encode::encode_into_vec(&record)?;
        let (segment_id, offset, size) = manager.append(&frame)?;

        keydir.insert(
            fingerprint,
            Locator {
                segment_id,
                offset,
                size,
                create_ts: old_locator.create_ts,
                expire_ts: old_locator.expire_ts,
            },
        );
    }

    for id in old_ids {
        let path = data_segment_path(manager.directory(), id);
        manager.forget(id);
        if path.exists() {
            std::fs::remove_file(path)?;
        }
    }

    // Same convention as Engine::close: name the snapshot after the segment
    // that is active once this pass finishes, so recovery knows every
    // segment up to and including it is already reflected here.
    let snapshot_id = manager.active_id();
    std::fs::create_dir_all(manager.directory().join(INDEX_DIRNAME))?;
    crate::snapshot::write_snapshot(
        &index_snapshot_path(manager.directory(), snapshot_id),
        keydir,
        crate::recovery::now_secs(),
    )?;

    log::info!("compaction finished, {} live keys remain", keydir.len());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{config::EngineOptions, engine::Engine};
    use test_log::test;

    #[test]
    fn compaction_preserves_live_values_and_shrinks_disk() -> Result<()> {
        let dir = tempfile::tempdir().unwrap();
        let engine = Engine::open(
            EngineOptions::new(dir.path())
                .file_max_size(4096)
                .total_size_trigger(u64::MAX),
        )?;

        for i in 0..200u32 {
            engine.put(format!("key-{i}").as_bytes(), b"some moderately sized value", None)?;
        }
        for i in 0..180u32 {
            // overwrite most keys, inflating on-disk size with stale data
            engine.put(format!("key-{i}").as_bytes(), b"updated value", None)?;
        }

        let before = engine.total_data_bytes()?;
        engine.compact()?;
        let after = engine.total_data_bytes()?;

        assert!(after < before, "compaction should shrink on-disk size");

        for i in 0..200u32 {
            let key = format!("key-{i}");
            let expected: &[u8] = if i < 180 { b"updated value" } else { b"some moderately sized value" };
            assert_eq!(engine.get(key.as_bytes())?, expected);
        }

        Ok(())
    }
}
