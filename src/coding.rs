// Copyright (c) 2024-present, caskdb contributors
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

use std::io::{Read, Write};

/// Error during serialization.
#[derive(Debug)]
pub enum EncodeError {
    /// I/O error.
    Io(std::io::Error),
}

/// Error during deserialization.
#[derive(Debug)]
pub enum DecodeError {
    /// I/O error.
    Io(std::io::Error),

    /// Checksum did not match the frame contents.
    ChecksumMismatch,

    /// Frame was truncated or otherwise malformed.
    InvalidFrame(&'static str),
}

impl std::fmt::Display for EncodeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for EncodeError {}

impl std::fmt::Display for DecodeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(e) => write!(f, "{e}"),
            Self::ChecksumMismatch => write!(f, "checksum mismatch"),
            Self::InvalidFrame(msg) => write!(f, "invalid frame: {msg}"),
        }
    }
}

impl std::error::Error for DecodeError {}

impl From<std::io::Error> for EncodeError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<std::io::Error> for DecodeError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

/// Trait to serialize stuff.
pub trait Encode {
    /// Serializes into writer.
    fn encode_into<W: Write>(&self, writer: &mut W) -> Result<(), EncodeError>;

    /// Serializes into vector.
    fn encode_into_vec(&self) -> Result<Vec<u8>, EncodeError> {
        let mut v = vec![];
        self.encode_into(&mut v)?;
        Ok(v)
    }
}

/// Trait to deserialize stuff.
pub trait Decode {
    /// Deserializes from reader.
    fn decode_from<R: Read>(reader: &mut R) -> Result<Self, DecodeError>
    where
        Self: Sized;
}
