// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Embedded archive introspection.
//!
//! Packaged executables carry their payload as a ZIP container appended after
//! a native launcher, with no header pointing at it. Introspection is a two
//! stage pipeline over an immutable byte buffer:
//!
//! 1. [`find_signature`] scans for the first ZIP local file header magic.
//! 2. The bytes from that offset on are handed to a ZIP reader. A rejected
//!    container is reported as [`Introspection::Malformed`], which callers
//!    treat the same as [`Introspection::NoSignature`].
//!
//! Neither stage can fail the measurement.

use std::io::Cursor;

use zip::result::ZipResult;
use zip::ZipArchive;

/// ZIP local file header magic, `PK\x03\x04`.
pub const ZIP_LOCAL_HEADER_SIGNATURE: [u8; 4] = *b"PK\x03\x04";

/// Outcome of introspecting a byte buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Introspection {
    /// No container signature anywhere in the buffer.
    NoSignature,
    /// Signature present but the bytes from there on are not a readable container.
    Malformed { offset: usize, reason: String },
    /// Container opened; entry names in central directory order.
    Archive { offset: usize, entries: Vec<String> },
}

impl Introspection {
    /// Entry names, empty unless a container was opened.
    pub fn entries(&self) -> &[String] {
        match self {
            Self::Archive { entries, .. } => entries,
            Self::NoSignature | Self::Malformed { .. } => &[],
        }
    }

    pub fn into_entries(self) -> Vec<String> {
        match self {
            Self::Archive { entries, .. } => entries,
            Self::NoSignature | Self::Malformed { .. } => Vec::new(),
        }
    }

    /// Offset of the signature, when one was found.
    pub fn offset(&self) -> Option<usize> {
        match self {
            Self::NoSignature => None,
            Self::Malformed { offset, .. } | Self::Archive { offset, .. } => Some(*offset),
        }
    }
}

/// Offset of the first ZIP local file header signature in `bytes`.
pub fn find_signature(bytes: &[u8]) -> Option<usize> {
    bytes
        .windows(ZIP_LOCAL_HEADER_SIGNATURE.len())
        .position(|window| window == ZIP_LOCAL_HEADER_SIGNATURE)
}

/// Locate and open the embedded container in `bytes`.
pub fn introspect(bytes: &[u8]) -> Introspection {
    let Some(offset) = find_signature(bytes) else {
        return Introspection::NoSignature;
    };

    match read_entry_names(&bytes[offset..]) {
        Ok(entries) => Introspection::Archive { offset, entries },
        Err(e) => Introspection::Malformed {
            offset,
            reason: e.to_string(),
        },
    }
}

/// Entry names of the embedded container, empty when there is none.
pub fn inspect(bytes: &[u8]) -> Vec<String> {
    introspect(bytes).into_entries()
}

fn read_entry_names(archive_bytes: &[u8]) -> ZipResult<Vec<String>> {
    let mut archive = ZipArchive::new(Cursor::new(archive_bytes))?;
    let mut names = Vec::with_capacity(archive.len());
    for index in 0..archive.len() {
        let entry = archive.by_index_raw(index)?;
        names.push(entry.name().to_string());
    }
    Ok(names)
}
