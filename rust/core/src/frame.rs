// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Frame envelope and record iteration
//!
//! ```text
//! ┌──────────┬────────────┬──────────────────────────────┐
//! │ Topic ID │ Frame type │ Records (8-byte aligned) ... │
//! │ u64 LE   │ u64 LE     │                              │
//! └──────────┴────────────┴──────────────────────────────┘
//! ```
//!
//! Records are decoded until the buffer is exhausted. The iterator stops at the
//! first error; whether that error ends the session is decided by
//! [`Error::is_fatal`](crate::Error::is_fatal).

use crate::error::Result;
use crate::reader::StreamReader;
use crate::record::Record;

/// Size of the topic id + frame type envelope
pub const FRAME_HEADER_SIZE: usize = 16;

/// Frame type carried in the envelope
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameType {
    /// Frame carrying records
    Data,
    /// End-of-stream sentinel, carries nothing
    EndOfStream,
    /// Anything else the server may send
    Other(u64),
}

impl FrameType {
    pub fn from_u64(value: u64) -> Self {
        match value {
            0 => FrameType::Data,
            1 => FrameType::EndOfStream,
            other => FrameType::Other(other),
        }
    }

    pub fn as_u64(self) -> u64 {
        match self {
            FrameType::Data => 0,
            FrameType::EndOfStream => 1,
            FrameType::Other(value) => value,
        }
    }
}

/// Decoded frame envelope
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameHeader {
    pub topic_id: u64,
    pub frame_type: FrameType,
}

/// Decoder over one frame buffer
#[derive(Debug)]
pub struct FrameDecoder<'a> {
    header: FrameHeader,
    reader: StreamReader<'a>,
    done: bool,
}

impl<'a> FrameDecoder<'a> {
    /// Read the envelope; records are decoded lazily by iterating
    pub fn new(data: &'a [u8]) -> Result<Self> {
        let mut reader = StreamReader::new(data);
        let topic_id = reader.read_u64()?;
        let frame_type = FrameType::from_u64(reader.read_u64()?);
        Ok(Self {
            header: FrameHeader {
                topic_id,
                frame_type,
            },
            reader,
            done: false,
        })
    }

    pub fn header(&self) -> FrameHeader {
        self.header
    }

    /// Cursor offset inside the frame
    pub fn position(&self) -> usize {
        self.reader.position()
    }

    /// Decode the next record and re-align to 8 bytes
    ///
    /// The last record of a frame may come without its trailing padding; the
    /// cursor then stops at the end of the buffer.
    fn next_record(&mut self) -> Result<Record> {
        let record = Record::decode(&mut self.reader)?;
        if self.reader.align8().is_err() {
            self.reader.skip_remaining();
        }
        Ok(record)
    }
}

impl Iterator for FrameDecoder<'_> {
    type Item = Result<Record>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done || self.header.frame_type != FrameType::Data || self.reader.remaining() == 0
        {
            return None;
        }
        let result = self.next_record();
        if result.is_err() {
            self.done = true;
        }
        Some(result)
    }
}
