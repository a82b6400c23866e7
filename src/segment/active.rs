// Copyright (c) 2024-present, caskdb contributors
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

use std::{
    fs::{File, OpenOptions},
    io::Write,
    os::unix::fs::FileExt,
    path::PathBuf,
};

use crate::id::SegmentId;

/// The unique writable, append-only segment currently receiving new
/// records.
pub struct ActiveSegment {
    pub(crate) id: SegmentId,
    path: PathBuf,
    file: File,
    offset: u64,
}

impl ActiveSegment {
    /// Creates a brand-new, empty active segment at `path`.
    pub fn create(id: SegmentId, path: PathBuf) -> std::io::Result<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(&path)?;

        Ok(Self {
            id,
            path,
            file,
            offset: 0,
        })
    }

    /// Reopens an existing segment file as the active segment, seeking to
    /// its current length so further appends continue past existing data.
    pub fn reopen(id: SegmentId, path: PathBuf) -> std::io::Result<Self> {
        let file = OpenOptions::new().read(true).write(true).open(&path)?;
        let offset = file.metadata()?.len();

        Ok(Self {
            id,
            path,
            file,
            offset,
        })
    }

    /// Segment id.
    #[must_use]
    pub fn id(&self) -> SegmentId {
        self.id
    }

    /// Current write offset; also the segment's current size in bytes.
    #[must_use]
    pub fn size(&self) -> u64 {
        self.offset
    }

    /// Path to the file backing this segment.
    #[must_use]
    pub fn path(&self) -> &std::path::Path {
        &self.path
    }

    /// Appends `frame` to the segment, returning the offset it was written
    /// at. Does not fsync; callers fsync on rotation or close.
    pub fn append(&mut self, frame: &[u8]) -> std::io::Result<u64> {
        let offset = self.offset;
        self.file.write_all(frame)?;
        self.offset += frame.len() as u64;
        Ok(offset)
    }

    /// Reads `size` bytes at `offset`, independent of the write cursor.
    pub fn read_at(&self, offset: u64, size: u32) -> std::io::Result<Vec<u8>> {
        let mut buf = vec![0u8; size as usize];
        self.file.read_exact_at(&mut buf, offset)?;
        Ok(buf)
    }

    /// Flushes buffered writes and fsyncs the file.
    pub fn sync(&self) -> std::io::Result<()> {
        self.file.sync_all()
    }

    /// Consumes this active segment, returning the file handle so it can be
    /// reopened read-only as an archived segment.
    pub fn into_parts(self) -> (SegmentId, PathBuf) {
        (self.id, self.path)
    }
}
