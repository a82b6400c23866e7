// Copyright (c) 2024-present, caskdb contributors
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

use std::{fs::File, os::unix::fs::FileExt, path::PathBuf};

use crate::id::SegmentId;

/// A full, read-only data segment retained for serving reads until
/// compaction removes it.
///
/// Keeps its file handle open for as long as any live locator might
/// reference it, and reads with `pread`-style positioned reads so
/// concurrent readers sharing the engine's shared lock never race on a
/// seek cursor.
pub struct ArchivedSegment {
    id: SegmentId,
    path: PathBuf,
    file: File,
}

impl ArchivedSegment {
    /// Opens `path` read-only.
    pub fn open(id: SegmentId, path: PathBuf) -> std::io::Result<Self> {
        let file = File::open(&path)?;
        Ok(Self { id, path, file })
    }

    /// Segment id.
    #[must_use]
    pub fn id(&self) -> SegmentId {
        self.id
    }

    /// Path to the file backing this segment.
    #[must_use]
    pub fn path(&self) -> &std::path::Path {
        &self.path
    }

    /// Reads `size` bytes at `offset`.
    pub fn read_at(&self, offset: u64, size: u32) -> std::io::Result<Vec<u8>> {
        let mut buf = vec![0u8; size as usize];
        self.file.read_exact_at(&mut buf, offset)?;
        Ok(buf)
    }

    /// Size of the segment file in bytes.
    pub fn len(&self) -> std::io::Result<u64> {
        Ok(self.file.metadata()?.len())
    }
}
