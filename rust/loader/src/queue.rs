// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! FIFO of frames waiting to be decoded
//!
//! Frames are appended as the transport delivers them and popped by the
//! loader's drain step, so arrival cadence and processing cadence are
//! independent. The queue never drops a frame: a capacity only makes
//! [`FrameQueue::push`] report saturation so the transport can be paused.
//!
//! # Watermarks
//!
//! - saturated when the length reaches `capacity`
//! - resumable when the length falls to `capacity / 2` or below

use std::collections::VecDeque;

use bytes::Bytes;

/// Result of pushing a frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueuePressure {
    /// Below capacity (or unbounded)
    Accepted,
    /// At or above capacity; the producer should pause
    Saturated,
}

/// Frame FIFO with an optional soft capacity
#[derive(Debug, Default)]
pub struct FrameQueue {
    frames: VecDeque<Bytes>,
    capacity: Option<usize>,
    /// Bytes currently queued
    queued_bytes: usize,
    /// Total frames ever pushed
    received: u64,
}

impl FrameQueue {
    /// Unbounded queue
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue reporting saturation at `capacity` frames (minimum 1)
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity: Some(capacity.max(1)),
            ..Self::default()
        }
    }

    pub fn capacity(&self) -> Option<usize> {
        self.capacity
    }

    /// Append a frame. The frame is always kept.
    pub fn push(&mut self, frame: Bytes) -> QueuePressure {
        self.queued_bytes += frame.len();
        self.received += 1;
        self.frames.push_back(frame);
        if self.is_saturated() {
            QueuePressure::Saturated
        } else {
            QueuePressure::Accepted
        }
    }

    pub fn pop(&mut self) -> Option<Bytes> {
        let frame = self.frames.pop_front()?;
        self.queued_bytes -= frame.len();
        Some(frame)
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn queued_bytes(&self) -> usize {
        self.queued_bytes
    }

    pub fn received(&self) -> u64 {
        self.received
    }

    #[inline]
    pub fn is_saturated(&self) -> bool {
        self.capacity.is_some_and(|cap| self.frames.len() >= cap)
    }

    /// Low watermark reached: a paused producer may resume
    #[inline]
    pub fn can_resume(&self) -> bool {
        match self.capacity {
            Some(cap) => self.frames.len() <= cap / 2,
            None => true,
        }
    }

    /// Drop everything queued
    pub fn clear(&mut self) {
        self.frames.clear();
        self.queued_bytes = 0;
    }
}
