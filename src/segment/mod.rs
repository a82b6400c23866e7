// Copyright (c) 2024-present, caskdb contributors
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

//! A segment is one file of the append-only log: either the unique `active`
//! (writable) segment, or one of the read-only `archived` segments. The
//! [`manager::SegmentManager`] owns both and mediates every append and read.

pub mod active;
pub mod archived;
pub mod manager;

use crate::id::SegmentId;
use std::path::{Path, PathBuf};

/// Extension used for data segment files.
pub const DATA_EXTENSION: &str = "data";

/// Extension used for index snapshot files.
pub const INDEX_EXTENSION: &str = "index";

/// Subdirectory under the data directory holding index snapshots.
pub const INDEX_DIRNAME: &str = "indexes";

/// Builds the path of the data segment with the given id.
#[must_use]
pub fn data_segment_path(directory: &Path, id: SegmentId) -> PathBuf {
    directory.join(format!("{id}.{DATA_EXTENSION}"))
}

/// Builds the path of the index snapshot with the given id.
#[must_use]
pub fn index_snapshot_path(directory: &Path, id: SegmentId) -> PathBuf {
    directory
        .join(INDEX_DIRNAME)
        .join(format!("{id}.{INDEX_EXTENSION}"))
}

/// Parses a segment id out of a data segment filename, if it matches the
/// expected `<id>.<ext>` shape.
#[must_use]
pub fn parse_segment_id(file_name: &str, extension: &str) -> Option<SegmentId> {
    file_name
        .strip_suffix(&format!(".{extension}"))
        .and_then(|stem| stem.parse().ok())
}
