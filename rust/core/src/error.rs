// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Error types for stream decoding.

use thiserror::Error;

/// Result type for stream decoding
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while decoding a geometry stream
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// A typed read or alignment ran past the end of the buffer.
    #[error("corrupt stream at offset {offset}: needed {needed} bytes, {available} available")]
    CorruptStream {
        offset: usize,
        needed: usize,
        available: usize,
    },

    /// A length prefix or element count was negative.
    #[error("corrupt stream at offset {offset}: negative length {length}")]
    NegativeLength { offset: usize, length: i64 },

    #[error("invalid UTF-8 string at offset {offset}")]
    InvalidString { offset: usize },

    #[error("stream does not start with BGS (found {0:?})")]
    BadMagic(String),

    #[error("unsupported protocol version {0}")]
    UnsupportedVersion(u8),

    /// Record discriminant this decoder cannot skip.
    #[error("unsupported record type {kind} at offset {offset}")]
    UnsupportedRecord { kind: u8, offset: usize },
}

impl Error {
    /// Whether the error must abort the whole load.
    ///
    /// Only an unsupported record is recoverable: it ends the current frame
    /// but later frames are still decoded.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Error::UnsupportedRecord { .. })
    }
}
