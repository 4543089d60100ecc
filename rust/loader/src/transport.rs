// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Transport boundary
//!
//! The transport downloads the stream and delivers binary frames. Delivery
//! itself is wired by the caller: its frame callback hands each frame to
//! [`GeometryLoader::enqueue`](crate::GeometryLoader::enqueue).

use crate::error::Result;

/// Topic the server streams one download on
pub type TopicId = u64;

/// Download state as reported by the transport
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportState {
    Started,
    Running,
    /// All frames have been sent
    Finished,
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportProgress {
    pub title: String,
    pub state: TransportState,
}

/// Download collaborator
pub trait Transport {
    /// Begin the download and return the topic its frames will carry
    fn start_download(&mut self) -> Result<TopicId>;

    fn progress(&self, topic: TopicId) -> TransportProgress;

    /// Release server-side resources for the topic
    fn cleanup(&mut self, topic: TopicId);

    /// Queue is saturated; stop delivering frames if possible
    fn pause(&mut self, _topic: TopicId) {}

    fn resume(&mut self, _topic: TopicId) {}
}
