// Copyright (c) 2024-present, caskdb contributors
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

use std::{collections::HashMap, path::PathBuf, sync::Arc};

use crate::{
    error::Result,
    id::{IdAllocator, SegmentId},
    segment::{active::ActiveSegment, archived::ArchivedSegment, data_segment_path},
};

/// Owns the unique active segment and every archived segment, and performs
/// rotation once the active segment crosses its size threshold.
pub struct SegmentManager {
    directory: PathBuf,
    id_allocator: Arc<IdAllocator>,
    threshold: u64,
    active: ActiveSegment,
    archive: HashMap<SegmentId, ArchivedSegment>,
}

impl SegmentManager {
    /// Assembles a manager from an already-opened active segment and a set
    /// of already-opened archived segments (used by recovery).
    pub fn new(
        directory: PathBuf,
        id_allocator: Arc<IdAllocator>,
        threshold: u64,
        active: ActiveSegment,
        archive: HashMap<SegmentId, ArchivedSegment>,
    ) -> Self {
        Self {
            directory,
            id_allocator,
            threshold,
            active,
            archive,
        }
    }

    /// Id of the current active segment.
    #[must_use]
    pub fn active_id(&self) -> SegmentId {
        self.active.id()
    }

    /// Appends `frame` to the active segment, rotating first if it would
    /// overflow the size threshold.
    pub fn append(&mut self, frame: &[u8]) -> Result<(SegmentId, u32, u32)> {
        if self.active.size() + frame.len() as u64 > self.threshold {
            self.rotate()?;
        }

        let offset = self.active.append(frame)?;
        Ok((self.active.id(), offset as u32, frame.len() as u32))
    }

    /// Serves a positioned read from whichever segment holds `segment_id`.
    pub fn read_at(&self, segment_id: SegmentId, offset: u32, size: u32) -> Result<Vec<u8>> {
        if segment_id == self.active.id() {
            Ok(self.active.read_at(u64::from(offset), size)?)
        } else {
            let segment = self
                .archive
                .get(&segment_id)
                .ok_or(crate::error::Error::Corruption)?;
            Ok(segment.read_at(u64::from(offset), size)?)
        }
    }

    /// Closes the active segment read-only, archives it, and opens a fresh
    /// active segment with a newly minted id.
    ///
    /// Held for its entire duration under the engine's exclusive lock: there
    /// is no window in which some caller could observe the active segment
    /// gone without the archive entry yet present, or vice versa.
    pub fn rotate(&mut self) -> Result<()> {
        self.active.sync()?;

        let new_id = self.id_allocator.next()?;
        let new_active = ActiveSegment::create(new_id, data_segment_path(&self.directory, new_id))?;
        let old_active = std::mem::replace(&mut self.active, new_active);

        let (old_id, old_path) = old_active.into_parts();
        let archived = ArchivedSegment::open(old_id, old_path)?;
        self.archive.insert(old_id, archived);

        Ok(())
    }

    /// Total bytes occupied by every data segment (active and archived).
    pub fn total_size(&self) -> Result<u64> {
        let mut total = self.active.size();
        for segment in self.archive.values() {
            total += segment.len()?;
        }
        Ok(total)
    }

    /// All segment ids currently known to this manager, active included.
    pub fn segment_ids(&self) -> Vec<SegmentId> {
        let mut ids: Vec<_> = self.archive.keys().copied().collect();
        ids.push(self.active.id());
        ids
    }

    /// Flushes and closes every segment (archived segments are already
    /// read-only and need no explicit flush).
    pub fn close_all(&self) -> Result<()> {
        self.active.sync()?;
        Ok(())
    }

    /// Drops this manager's in-memory reference to `id`, without touching
    /// the file on disk. Used by compaction after the caller has deleted the
    /// underlying file.
    pub fn forget(&mut self, id: SegmentId) {
        self.archive.remove(&id);
    }

    /// Data directory this manager is rooted at.
    #[must_use]
    pub fn directory(&self) -> &std::path::Path {
        &self.directory
    }
}
