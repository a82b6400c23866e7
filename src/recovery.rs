// Copyright (c) 2024-present, caskdb contributors
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

//! What happens at [`crate::engine::Engine::open`]: creating a brand-new
//! data directory, or recovering an existing one.
//!
//! Recovery without an index snapshot falls back to scanning every data
//! segment and replaying record headers. That scan cannot recover
//! time-to-live metadata (the record frame itself carries none — only the
//! index snapshot does) nor removed keys (`remove` never appends a
//! tombstone; it only deletes the in-memory entry). A crash between writes
//! and the next `close()` therefore resurrects any key removed in that
//! window, an accepted trade against widening every record frame with a
//! deletion marker just to carry a tombstone.

use std::{
    collections::HashMap,
    fs::File,
    io::{BufReader, Read},
    path::Path,
    sync::Arc,
};

use crate::{
    coding::Decode,
    config::EngineOptions,
    error::{Error, Result},
    hash::fingerprint,
    id::{IdAllocator, SegmentId},
    keydir::KeyDirectory,
    locator::Locator,
    record::Record,
    segment::{
        active::ActiveSegment, archived::ArchivedSegment, data_segment_path,
        index_snapshot_path, parse_segment_id, DATA_EXTENSION, INDEX_DIRNAME, INDEX_EXTENSION,
    },
    segment::manager::SegmentManager,
    version::Version,
};

const MARKER_FILE: &str = ".cask";

fn marker_path(directory: &Path) -> std::path::PathBuf {
    directory.join(MARKER_FILE)
}

fn write_marker(directory: &Path) -> std::io::Result<()> {
    let mut file = File::create(marker_path(directory))?;
    Version::V1.write_file_header(&mut file)?;
    file.sync_all()?;
    Ok(())
}

fn validate_marker(directory: &Path) -> Result<()> {
    let mut buf = Vec::new();
    File::open(marker_path(directory))?.read_to_end(&mut buf)?;

    match Version::parse_file_header(&buf) {
        Some(Version::V1) => Ok(()),
        None => Err(Error::Corruption),
    }
}

pub(crate) fn now_secs() -> u32 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .expect("system clock before epoch")
        .as_secs() as u32
}

fn list_data_segment_ids(directory: &Path) -> std::io::Result<Vec<SegmentId>> {
    let mut ids = Vec::new();
    for entry in std::fs::read_dir(directory)? {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        if let Some(name) = entry.file_name().to_str() {
            if let Some(id) = parse_segment_id(name, DATA_EXTENSION) {
                ids.push(id);
            }
        }
    }
    ids.sort_unstable();
    Ok(ids)
}

fn newest_index_snapshot(directory: &Path) -> std::io::Result<Option<SegmentId>> {
    let index_dir = directory.join(INDEX_DIRNAME);
    if !index_dir.exists() {
        return Ok(None);
    }

    let mut newest = None;
    for entry in std::fs::read_dir(&index_dir)? {
        let entry = entry?;
        if let Some(name) = entry.file_name().to_str() {
            if let Some(id) = parse_segment_id(name, INDEX_EXTENSION) {
                newest = Some(newest.map_or(id, |n: SegmentId| n.max(id)));
            }
        }
    }
    Ok(newest)
}

/// Replays every record header in every data segment, in ascending segment
/// id order, to rebuild the key directory without an index snapshot.
///
/// A truncated trailing record (the process was killed mid-append) stops
/// the scan of that segment rather than failing recovery outright.
fn scan_segments(directory: &Path, ids: &[SegmentId]) -> Result<KeyDirectory> {
    let mut keydir = KeyDirectory::new(0);

    for &id in ids {
        let file = File::open(data_segment_path(directory, id))?;
        let mut reader = BufReader::new(file);
        let mut offset: u32 = 0;

        loop {
            let mut header = [0u8; crate::record::RECORD_HEADER_LEN];
            match reader.read_exact(&mut header) {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => break,
                Err(e) => return Err(e.into()),
            }

            let ksz = u32::from_le_bytes(header[12..16].try_into().unwrap());
            let vsz = u32::from_le_bytes(header[16..20].try_into().unwrap());
            let timestamp = u64::from_le_bytes(header[4..12].try_into().unwrap());

            let mut body = vec![0u8; (ksz + vsz) as usize];
            match reader.read_exact(&mut body) {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => break,
                Err(_) => break,
            }

            let key = &body[..ksz as usize];
            let record_len = crate::record::RECORD_HEADER_LEN as u32 + ksz + vsz;

            keydir.insert(
                fingerprint(key),
                Locator {
                    segment_id: id,
                    offset,
                    size: record_len,
                    create_ts: timestamp as u32,
                    expire_ts: 0,
                },
            );

            offset += record_len;
        }
    }

    Ok(keydir)
}

fn open_archive(
    directory: &Path,
    ids: impl Iterator<Item = SegmentId>,
    skip: SegmentId,
) -> Result<HashMap<SegmentId, ArchivedSegment>> {
    let mut archive = HashMap::new();
    for id in ids {
        if id == skip {
            continue;
        }
        archive.insert(id, ArchivedSegment::open(id, data_segment_path(directory, id))?);
    }
    Ok(archive)
}

/// Bootstraps a fresh, empty data directory.
pub fn create_new(
    options: &EngineOptions,
) -> Result<(SegmentManager, KeyDirectory, Arc<IdAllocator>)> {
    std::fs::create_dir_all(&options.directory)?;
    std::fs::create_dir_all(options.directory.join(INDEX_DIRNAME))?;
    write_marker(&options.directory)?;

    let id_allocator = Arc::new(IdAllocator::open(options.directory.join(".cask.id"), 0)?);
    let active_id = id_allocator.next()?;
    let active = ActiveSegment::create(active_id, data_segment_path(&options.directory, active_id))?;

    let manager = SegmentManager::new(
        options.directory.clone(),
        id_allocator.clone(),
        options.file_max_size,
        active,
        HashMap::new(),
    );

    Ok((
        manager,
        KeyDirectory::new(options.initial_index_capacity),
        id_allocator,
    ))
}

/// Recovers an existing data directory.
pub fn recover(options: &EngineOptions) -> Result<(SegmentManager, KeyDirectory, Arc<IdAllocator>)> {
    validate_marker(&options.directory)?;

    let ids = list_data_segment_ids(&options.directory)?;
    let id_allocator = Arc::new(IdAllocator::open(
        options.directory.join(".cask.id"),
        ids.iter().copied().max().unwrap_or(0),
    )?);
    if let Some(&max_id) = ids.iter().max() {
        id_allocator.fast_forward(max_id)?;
    }

    let now = now_secs();
    let mut keydir = match newest_index_snapshot(&options.directory)? {
        Some(snapshot_id) => {
            let mut keydir = crate::snapshot::read_snapshot(
                &index_snapshot_path(&options.directory, snapshot_id),
                now,
            )?;

            // The snapshot only reflects segments up to `snapshot_id` (the
            // active segment at the close() that produced it). Anything
            // written after that close but before this crash lives only in
            // segments with a higher id, which were never scanned — replay
            // those on top, in ascending id order so later writes win.
            let unreflected: Vec<SegmentId> =
                ids.iter().copied().filter(|&id| id > snapshot_id).collect();
            if !unreflected.is_empty() {
                log::info!(
                    "replaying {} segment(s) written after the last snapshot",
                    unreflected.len()
                );
                for (fingerprint, locator) in scan_segments(&options.directory, &unreflected)?.iter() {
                    keydir.insert(fingerprint, locator);
                }
            }

            keydir
        }
        None => scan_segments(&options.directory, &ids)?,
    };

    let active_id = ids.iter().copied().max();
    let (active, archive) = match active_id {
        Some(id) => {
            let path = data_segment_path(&options.directory, id);
            let size = std::fs::metadata(&path)?.len();

            let archive = open_archive(&options.directory, ids.iter().copied(), id)?;

            if size >= options.file_max_size {
                let new_id = id_allocator.next()?;
                let mut archive = archive;
                archive.insert(id, ArchivedSegment::open(id, path)?);
                let active =
                    ActiveSegment::create(new_id, data_segment_path(&options.directory, new_id))?;
                (active, archive)
            } else {
                (ActiveSegment::reopen(id, path)?, archive)
            }
        }
        None => {
            let new_id = id_allocator.next()?;
            (
                ActiveSegment::create(new_id, data_segment_path(&options.directory, new_id))?,
                HashMap::new(),
            )
        }
    };

    let mut manager = SegmentManager::new(
        options.directory.clone(),
        id_allocator.clone(),
        options.file_max_size,
        active,
        archive,
    );

    if manager.total_size()? >= options.total_size_trigger {
        crate::compaction::compact(&mut manager, &mut keydir)?;
    }

    Ok((manager, keydir, id_allocator))
}

/// Verifies a record read back from disk by fully decoding it (checks CRC).
pub(crate) fn verify_record(bytes: &[u8]) -> Result<Record> {
    Ok(Record::decode_from(&mut std::io::Cursor::new(bytes))?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{coding::Encode, engine::Engine};
    use std::io::Write;
    use test_log::test;

    #[test]
    fn create_new_then_recover_empty() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let options = EngineOptions::new(dir.path());

        {
            let engine = Engine::open(EngineOptions::new(dir.path()))?;
            engine.close()?;
        }

        let (_, keydir, _) = recover(&options)?;
        assert!(keydir.is_empty());
        Ok(())
    }

    #[test]
    fn scan_fallback_rebuilds_keydir_without_snapshot() -> Result<()> {
        let dir = tempfile::tempdir().unwrap();

        std::fs::create_dir_all(dir.path().join(INDEX_DIRNAME)).unwrap();
        write_marker(dir.path()).unwrap();

        let record = Record {
            timestamp: 123,
            key: b"k".to_vec(),
            value: b"v".to_vec(),
        };
        let mut file = File::create(data_segment_path(dir.path(), 1)).unwrap();
        file.write_all(&record.encode_into_vec().unwrap()).unwrap();
        drop(file);

        let keydir = scan_segments(dir.path(), &[1]).unwrap();
        assert_eq!(keydir.len(), 1);
        assert!(keydir.get(fingerprint(b"k")).is_some());
        Ok(())
    }
}
