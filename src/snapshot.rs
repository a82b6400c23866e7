// Copyright (c) 2024-present, caskdb contributors
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

//! Index snapshots: a side file listing every live `(fingerprint, locator)`
//! pair, written at [`crate::engine::Engine::close`] and consumed on the next
//! open so recovery does not need to rescan every data segment.

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use std::{
    fs::File,
    io::{BufReader, BufWriter, Cursor, Read, Write},
    path::Path,
};

use crate::{
    coding::DecodeError,
    hash::Fingerprint,
    id::SegmentId,
    keydir::KeyDirectory,
    locator::Locator,
};

/// Fixed size of one index frame.
pub const INDEX_FRAME_LEN: usize = 36;

/// Encodes one `(fingerprint, locator)` pair into its 36-byte index frame.
///
/// Layout, little-endian: `CRC32(4) | fingerprint(8) | segment_id(8) |
/// create_ts(4) | expire_ts(4) | size(4) | offset(4)`.
fn encode_index_frame(fingerprint: Fingerprint, locator: Locator) -> [u8; INDEX_FRAME_LEN] {
    let mut body = Vec::with_capacity(INDEX_FRAME_LEN - 4);
    body.write_u64::<LittleEndian>(fingerprint).unwrap();
    body.write_u64::<LittleEndian>(locator.segment_id).unwrap();
    body.write_u32::<LittleEndian>(locator.create_ts).unwrap();
    body.write_u32::<LittleEndian>(locator.expire_ts).unwrap();
    body.write_u32::<LittleEndian>(locator.size).unwrap();
    body.write_u32::<LittleEndian>(locator.offset).unwrap();

    let crc = crc32fast::hash(&body);

    let mut frame = [0u8; INDEX_FRAME_LEN];
    (&mut frame[..4]).write_u32::<LittleEndian>(crc).unwrap();
    frame[4..].copy_from_slice(&body);
    frame
}

fn decode_index_frame(frame: &[u8]) -> Result<(Fingerprint, Locator), DecodeError> {
    if frame.len() != INDEX_FRAME_LEN {
        return Err(DecodeError::InvalidFrame("index frame has wrong length"));
    }

    let crc = (&frame[..4]).read_u32::<LittleEndian>()?;
    let body = &frame[4..];

    if crc32fast::hash(body) != crc {
        return Err(DecodeError::ChecksumMismatch);
    }

    let mut cursor = Cursor::new(body);
    let fingerprint = cursor.read_u64::<LittleEndian>()?;
    let segment_id: SegmentId = cursor.read_u64::<LittleEndian>()?;
    let create_ts = cursor.read_u32::<LittleEndian>()?;
    let expire_ts = cursor.read_u32::<LittleEndian>()?;
    let size = cursor.read_u32::<LittleEndian>()?;
    let offset = cursor.read_u32::<LittleEndian>()?;

    Ok((
        fingerprint,
        Locator {
            segment_id,
            offset,
            size,
            create_ts,
            expire_ts,
        },
    ))
}

/// Writes every entry of `keydir` still live at `now` to `path` as a
/// sequence of index frames, atomically (write-to-temp-then-rename).
/// Entries that have already expired are dropped rather than written, so a
/// stale TTL never resurfaces after a reopen.
pub fn write_snapshot(path: &Path, keydir: &KeyDirectory, now: u32) -> std::io::Result<()> {
    let folder = path.parent().expect("snapshot path should have a parent");
    let mut temp_file = tempfile::NamedTempFile::new_in(folder)?;

    {
        let mut writer = BufWriter::new(&mut temp_file);
        for (fingerprint, locator) in keydir.iter() {
            if locator.is_live_at(now) {
                writer.write_all(&encode_index_frame(fingerprint, locator))?;
            }
        }
        writer.flush()?;
    }

    temp_file.persist(path).map_err(|e| e.error)?;

    #[cfg(not(target_os = "windows"))]
    {
        File::open(path)?.sync_all()?;
    }

    Ok(())
}

/// Reads an index snapshot back into a fresh [`KeyDirectory`].
///
/// Any entry whose `expire_ts` has already passed `now` is dropped rather
/// than inserted, mirroring the lazy-TTL policy the engine applies to reads.
pub fn read_snapshot(path: &Path, now: u32) -> crate::error::Result<KeyDirectory> {
    let file = File::open(path)?;
    let mut reader = BufReader::new(file);
    let mut keydir = KeyDirectory::new(0);

    let mut frame = [0u8; INDEX_FRAME_LEN];
    loop {
        match reader.read_exact(&mut frame) {
            Ok(()) => {
                let (fingerprint, locator) = decode_index_frame(&frame)?;
                if locator.is_live_at(now) {
                    keydir.insert(fingerprint, locator);
                }
            }
            Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => break,
            Err(e) => return Err(e.into()),
        }
    }

    Ok(keydir)
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_log::test;

    fn locator(id: SegmentId) -> Locator {
        Locator {
            segment_id: id,
            offset: 4,
            size: 40,
            create_ts: 100,
            expire_ts: 0,
        }
    }

    #[test]
    fn frame_round_trip() {
        let frame = encode_index_frame(42, locator(7));
        let (fingerprint, locator) = decode_index_frame(&frame).unwrap();
        assert_eq!(fingerprint, 42);
        assert_eq!(locator.segment_id, 7);
    }

    #[test]
    fn frame_detects_corruption() {
        let mut frame = encode_index_frame(42, locator(7));
        frame[20] ^= 0xFF;
        assert!(decode_index_frame(&frame).is_err());
    }

    #[test]
    fn snapshot_round_trip() -> crate::error::Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("0.index");

        let mut keydir = KeyDirectory::new(0);
        keydir.insert(1, locator(1));
        keydir.insert(2, locator(2));

        write_snapshot(&path, &keydir, 0)?;
        let loaded = read_snapshot(&path, 0)?;

        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded.get(1), keydir.get(1));
        Ok(())
    }

    #[test]
    fn snapshot_skips_expired() -> crate::error::Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("0.index");

        let mut keydir = KeyDirectory::new(0);
        keydir.insert(1, locator(1));
        keydir.insert(2, Locator { expire_ts: 50, ..locator(2) });

        write_snapshot(&path, &keydir, 100)?;
        let loaded = read_snapshot(&path, 100)?;

        assert_eq!(loaded.len(), 1);
        assert!(loaded.get(2).is_none());
        Ok(())
    }

    #[test]
    fn write_snapshot_drops_already_expired_entries() -> crate::error::Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("0.index");

        let mut keydir = KeyDirectory::new(0);
        keydir.insert(1, locator(1));
        keydir.insert(2, Locator { expire_ts: 50, ..locator(2) });

        // Written as already-expired at the time of the snapshot itself.
        write_snapshot(&path, &keydir, 100)?;

        // Even reading back with a `now` before the cutoff, the expired
        // entry is gone: it was never written in the first place.
        let loaded = read_snapshot(&path, 0)?;
        assert_eq!(loaded.len(), 1);
        assert!(loaded.get(2).is_none());
        Ok(())
    }
}
