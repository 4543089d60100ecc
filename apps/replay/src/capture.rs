// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Captured frame streams
//!
//! A capture is the concatenation of every frame the server sent, each
//! prefixed with its length as `u32` little-endian.

use std::collections::VecDeque;
use std::path::Path;

use anyhow::{bail, Context, Result};
use bytes::{Buf, Bytes};
use ifc_stream_core::{FrameDecoder, FrameType, Record};
use ifc_stream_loader::{
    TopicId, TranslationTable, Transport, TransportProgress, TransportState,
};
use tracing::{debug, warn};

/// Split a capture into frames
pub fn parse_capture(mut data: Bytes) -> Result<Vec<Bytes>> {
    let mut frames = Vec::new();
    while data.has_remaining() {
        if data.remaining() < 4 {
            bail!(
                "truncated length prefix after frame {} ({} bytes left)",
                frames.len(),
                data.remaining()
            );
        }
        let len = data.get_u32_le() as usize;
        if data.remaining() < len {
            bail!(
                "frame {} declares {} bytes, only {} left",
                frames.len(),
                len,
                data.remaining()
            );
        }
        frames.push(data.split_to(len));
    }
    Ok(frames)
}

pub fn read_capture(path: &Path) -> Result<Vec<Bytes>> {
    let data = std::fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    parse_capture(Bytes::from(data)).with_context(|| format!("parsing {}", path.display()))
}

/// Topic of the first data frame
pub fn first_topic(frames: &[Bytes]) -> Option<TopicId> {
    frames.iter().find_map(|frame| {
        let header = FrameDecoder::new(frame).ok()?.header();
        (header.frame_type == FrameType::Data).then_some(header.topic_id)
    })
}

/// Identity translation over every geometry-info id the capture mentions
pub fn identity_translation(frames: &[Bytes]) -> TranslationTable {
    let mut table = TranslationTable::default();
    for frame in frames {
        let Ok(decoder) = FrameDecoder::new(frame) else {
            continue;
        };
        for record in decoder {
            match record {
                Ok(Record::Object(object)) => {
                    table.insert(object.geometry_info_id, object.geometry_info_id);
                }
                Ok(Record::MinimalObject(object)) => {
                    table.insert(object.geometry_info_id, object.geometry_info_id);
                }
                Ok(_) => {}
                // The loader reports it during the replay
                Err(_) => break,
            }
        }
    }
    table
}

/// Transport serving frames from a capture
#[derive(Debug)]
pub struct CaptureTransport {
    frames: VecDeque<Bytes>,
    topic_id: TopicId,
    total: usize,
    started: bool,
    paused: bool,
    cleaned_up: bool,
}

impl CaptureTransport {
    pub fn new(frames: Vec<Bytes>, topic_id: TopicId) -> Self {
        Self {
            total: frames.len(),
            frames: frames.into(),
            topic_id,
            started: false,
            paused: false,
            cleaned_up: false,
        }
    }

    /// Next frame to deliver; nothing while paused or before the download started
    pub fn next_frame(&mut self) -> Option<Bytes> {
        if !self.started || self.paused {
            return None;
        }
        self.frames.pop_front()
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn is_exhausted(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn delivered(&self) -> usize {
        self.total - self.frames.len()
    }

    pub fn cleaned_up(&self) -> bool {
        self.cleaned_up
    }
}

impl Transport for CaptureTransport {
    fn start_download(&mut self) -> ifc_stream_loader::Result<TopicId> {
        self.started = true;
        debug!(topic_id = self.topic_id, frames = self.total, "replaying capture");
        Ok(self.topic_id)
    }

    fn progress(&self, _topic: TopicId) -> TransportProgress {
        let state = if !self.started {
            TransportState::Started
        } else if self.frames.is_empty() {
            TransportState::Finished
        } else {
            TransportState::Running
        };
        TransportProgress {
            title: format!("Replaying {}/{} frames", self.delivered(), self.total),
            state,
        }
    }

    fn cleanup(&mut self, topic: TopicId) {
        if topic != self.topic_id {
            warn!(topic, "cleanup for unknown topic");
            return;
        }
        self.cleaned_up = true;
    }

    fn pause(&mut self, _topic: TopicId) {
        self.paused = true;
    }

    fn resume(&mut self, _topic: TopicId) {
        self.paused = false;
    }
}
