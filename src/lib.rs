// Copyright (c) 2024-present, caskdb contributors
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

//! An embedded, single-node, append-only key-value storage engine in the
//! Bitcask family.
//!
//! Keys are opaque byte strings, hashed to a 64-bit fingerprint that is the
//! only thing kept in memory per key; values are opaque byte strings,
//! optionally time-limited and optionally encrypted. The entire key
//! directory lives in memory, so point reads and writes only ever need one
//! disk seek.
//!
//! The data directory's contents are split into segments: exactly one is
//! active (writable), the rest are read-only. As values are overwritten or
//! removed, old segments accumulate stale data; [`Engine::compact`]
//! rewrites live records into fresh segments and discards the rest.
//!
//! # Example usage
//!
//! ```
//! use caskdb::{Engine, EngineOptions};
//!
//! # fn main() -> caskdb::Result<()> {
//! # let folder = tempfile::tempdir()?;
//! let engine = Engine::open(EngineOptions::new(folder.path()))?;
//!
//! engine.put(b"hello", b"world", None)?;
//! assert_eq!(engine.get(b"hello")?, b"world");
//!
//! engine.close()?;
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![deny(clippy::all, missing_docs, clippy::cargo)]
#![deny(clippy::unwrap_used)]
#![warn(clippy::pedantic, clippy::nursery)]
#![warn(clippy::expect_used)]
#![allow(clippy::missing_const_for_fn)]
#![warn(clippy::multiple_crate_versions)]

mod cipher;
mod coding;
mod compaction;
mod config;
mod engine;
mod error;
mod hash;
mod id;
mod keydir;
mod lock;
mod locator;
mod record;
mod recovery;
mod segment;
mod snapshot;
mod version;

pub use {
    cipher::EncryptionKey,
    config::EngineOptions,
    engine::Engine,
    error::{Error, Result},
    hash::Fingerprint,
    locator::Locator,
};

#[doc(hidden)]
pub use id::SegmentId;
