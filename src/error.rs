// Copyright (c) 2024-present, caskdb contributors
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

use crate::coding::{DecodeError, EncodeError};

/// Represents errors that can occur in the storage engine.
#[derive(Debug)]
#[non_exhaustive]
pub enum Error {
    /// I/O error.
    Io(std::io::Error),

    /// A configuration option was missing or invalid.
    InvalidConfig(&'static str),

    /// A record or index frame failed its checksum, was truncated, or a
    /// file header was unrecognized.
    Corruption,

    /// The requested key does not exist.
    NotFound,

    /// The requested key exists but its time-to-live has elapsed.
    Expired,

    /// A cipher operation failed (bad key length, bad padding, ...).
    EncryptionError,

    /// The data directory is already locked by a live engine handle.
    AlreadyOpen,

    /// The engine handle has already been closed.
    AlreadyClosed,
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(e) => write!(f, "I/O error: {e}"),
            Self::InvalidConfig(msg) => write!(f, "invalid configuration: {msg}"),
            Self::Corruption => write!(f, "corruption detected"),
            Self::NotFound => write!(f, "key not found"),
            Self::Expired => write!(f, "key expired"),
            Self::EncryptionError => write!(f, "encryption error"),
            Self::AlreadyOpen => write!(f, "data directory already open"),
            Self::AlreadyClosed => write!(f, "engine already closed"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<EncodeError> for Error {
    fn from(value: EncodeError) -> Self {
        match value {
            EncodeError::Io(e) => Self::Io(e),
        }
    }
}

impl From<DecodeError> for Error {
    fn from(value: DecodeError) -> Self {
        match value {
            DecodeError::Io(e) => Self::Io(e),
            DecodeError::ChecksumMismatch | DecodeError::InvalidFrame(_) => Self::Corruption,
        }
    }
}

/// Storage engine result.
pub type Result<T> = std::result::Result<T, Error>;
