// Copyright (c) 2024-present, caskdb contributors
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

//! The store-level format marker.
//!
//! Individual data segments are headerless byte streams of record frames
//! (see [`crate::record`]) — the on-disk record layout has no room for a
//! per-segment header without changing the fixed wire format. Instead, a
//! single marker file lives once at the data directory root, written the
//! first time the directory is created and never rewritten afterward.

use byteorder::WriteBytesExt;

/// Disk format version.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Version {
    /// Version for 0.x.x releases.
    V1,
}

impl std::fmt::Display for Version {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", u8::from(*self))
    }
}

impl From<Version> for u8 {
    fn from(value: Version) -> Self {
        match value {
            Version::V1 => 1,
        }
    }
}

impl TryFrom<u8> for Version {
    type Error = ();
    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Self::V1),
            _ => Err(()),
        }
    }
}

const MAGIC_BYTES: [u8; 4] = [b'C', b'A', b'S', b'K'];

impl Version {
    #[allow(unused)]
    pub(crate) fn len() -> u8 {
        5
    }

    pub(crate) fn parse_file_header(bytes: &[u8]) -> Option<Self> {
        let first_four = bytes.get(0..4)?;

        if first_four == MAGIC_BYTES {
            let version = *bytes.get(4)?;
            Self::try_from(version).ok()
        } else {
            None
        }
    }

    pub(crate) fn write_file_header<W: std::io::Write>(
        self,
        writer: &mut W,
    ) -> std::io::Result<usize> {
        writer.write_all(&MAGIC_BYTES)?;
        writer.write_u8(u8::from(self))?;
        Ok(5)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_log::test;

    #[test]
    fn version_serialize() -> std::io::Result<()> {
        let mut bytes = vec![];
        Version::V1.write_file_header(&mut bytes)?;
        assert_eq!(bytes, &[b'C', b'A', b'S', b'K', 1]);
        Ok(())
    }

    #[test]
    fn version_deserialize_success() {
        let version = Version::parse_file_header(&[b'C', b'A', b'S', b'K', 1]);
        assert_eq!(version, Some(Version::V1));
    }

    #[test]
    fn version_deserialize_fail() {
        let version = Version::parse_file_header(&[b'F', b'J', b'X', b'X', 1]);
        assert!(version.is_none());
    }

    #[test]
    fn version_len() {
        let mut buf = vec![];
        let size = Version::V1.write_file_header(&mut buf).expect("can't fail");
        assert_eq!(Version::len() as usize, size);
    }
}
