// Copyright (c) 2024-present, caskdb contributors
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

//! Binary layout of the append-only log: record frames and index frames.
//!
//! Record frame, all integers little-endian:
//!
//! ```text
//! | CRC32 4 | timestamp 8 | ksz 4 | vsz 4 | key ksz | value vsz |
//! ```
//!
//! The CRC32 covers every byte after itself. This is the only shape a byte
//! range in a data segment ever takes; there is no per-segment header mixed
//! into this layout (see [`crate::version`] for the store-level marker).

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use std::io::{Cursor, Read, Write};

use crate::coding::{Decode, DecodeError, Encode, EncodeError};

/// Fixed header size of a record frame, before key and value bytes.
pub const RECORD_HEADER_LEN: usize = 20;

/// A single logical write: a key, a value, and the second it was written.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Record {
    /// Wall-clock second the record was appended.
    pub timestamp: u64,

    /// The user's key bytes.
    pub key: Vec<u8>,

    /// The user's value bytes (already encrypted, if encryption is on).
    pub value: Vec<u8>,
}

impl Record {
    /// Total size in bytes this record occupies once encoded.
    #[must_use]
    pub fn encoded_len(&self) -> usize {
        RECORD_HEADER_LEN + self.key.len() + self.value.len()
    }
}

impl Encode for Record {
    fn encode_into<W: Write>(&self, writer: &mut W) -> Result<(), EncodeError> {
        let mut body = Vec::with_capacity(self.encoded_len() - 4);
        body.write_u64::<LittleEndian>(self.timestamp)?;
        body.write_u32::<LittleEndian>(self.key.len() as u32)?;
        body.write_u32::<LittleEndian>(self.value.len() as u32)?;
        body.extend_from_slice(&self.key);
        body.extend_from_slice(&self.value);

        let crc = crc32fast::hash(&body);
        writer.write_u32::<LittleEndian>(crc)?;
        writer.write_all(&body)?;
        Ok(())
    }
}

impl Decode for Record {
    fn decode_from<R: Read>(reader: &mut R) -> Result<Self, DecodeError> {
        let crc = reader.read_u32::<LittleEndian>()?;

        let mut rest = Vec::new();
        reader.read_to_end(&mut rest)?;

        if rest.len() < RECORD_HEADER_LEN - 4 {
            return Err(DecodeError::InvalidFrame("record header truncated"));
        }

        if crc32fast::hash(&rest) != crc {
            return Err(DecodeError::ChecksumMismatch);
        }

        let mut cursor = Cursor::new(&rest);
        let timestamp = cursor.read_u64::<LittleEndian>()?;
        let ksz = cursor.read_u32::<LittleEndian>()? as usize;
        let vsz = cursor.read_u32::<LittleEndian>()? as usize;

        let body = &rest[RECORD_HEADER_LEN - 4..];
        if body.len() != ksz + vsz {
            return Err(DecodeError::InvalidFrame("key/value size mismatch"));
        }

        let key = body[..ksz].to_vec();
        let value = body[ksz..].to_vec();

        Ok(Self {
            timestamp,
            key,
            value,
        })
    }
}

/// Decodes a record from an exact-sized byte slice already read off disk.
pub fn decode_record_bytes(bytes: &[u8]) -> Result<Record, DecodeError> {
    Record::decode_from(&mut Cursor::new(bytes))
}
