// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Loading session
//!
//! [`GeometryLoader`] owns one download: it starts the transport, buffers the
//! frames the transport delivers, decodes them on [`drain`](GeometryLoader::drain)
//! and routes records to the resolver and the model builder.
//!
//! ```text
//! transport ──enqueue──▶ FrameQueue ──drain──▶ FrameDecoder ──▶ DependencyResolver ──▶ ModelBuilder
//! ```

use std::time::Instant;

use bytes::Bytes;
use ifc_stream_core::{FrameDecoder, FrameType, Record, StreamHeader};
use tracing::{debug, error, info, trace, warn};

use crate::builder::ModelBuilder;
use crate::config::LoaderConfig;
use crate::defaults::TypeDefaults;
use crate::error::{LoaderError, Result};
use crate::progress::{ListenerId, ProgressEvent, ProgressPhase, ProgressTracker};
use crate::queue::{FrameQueue, QueuePressure};
use crate::resolver::{DependencyResolver, ResolverStats, TranslationTable, UnresolvedReport};
use crate::transport::{TopicId, Transport, TransportProgress, TransportState};

/// Snapshot of a session's lifecycle
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionState {
    /// Version from the stream header
    pub protocol_version: Option<u8>,
    pub nr_objects_read: usize,
    /// Stream header received
    pub started: bool,
    /// End record received, or the transport finished with nothing queued
    pub finished: bool,
    pub failed: bool,
    /// Set by [`GeometryLoader::start`]
    pub topic_id: Option<TopicId>,
}

/// Incremental geometry loader for one streamed model
pub struct GeometryLoader<B, T> {
    config: LoaderConfig,
    builder: B,
    transport: T,
    resolver: DependencyResolver,
    queue: FrameQueue,
    progress: ProgressTracker,
    session: SessionState,
    /// Transport was asked to pause and not resumed yet
    paused: bool,
    last_activity: Option<Instant>,
}

impl<B: ModelBuilder, T: Transport> GeometryLoader<B, T> {
    pub fn new(
        config: LoaderConfig,
        builder: B,
        transport: T,
        translation: TranslationTable,
        defaults: TypeDefaults,
    ) -> Self {
        let nr_objects_total = config.nr_objects_total.unwrap_or(translation.len());
        let queue = match config.max_queued_frames {
            Some(capacity) => FrameQueue::with_capacity(capacity),
            None => FrameQueue::new(),
        };
        Self {
            config,
            builder,
            transport,
            resolver: DependencyResolver::new(translation, defaults),
            queue,
            progress: ProgressTracker::new(nr_objects_total),
            session: SessionState::default(),
            paused: false,
            last_activity: None,
        }
    }

    /// Start the download. Calling it again returns the running topic.
    pub fn start(&mut self) -> Result<TopicId> {
        if self.session.failed {
            return Err(LoaderError::SessionFailed);
        }
        if let Some(topic_id) = self.session.topic_id {
            return Ok(topic_id);
        }

        let topic_id = self.transport.start_download()?;
        self.session.topic_id = Some(topic_id);
        self.last_activity = Some(Instant::now());
        info!(
            topic_id,
            objects_total = self.progress.nr_objects_total(),
            "geometry loading started"
        );
        Ok(topic_id)
    }

    /// Buffer a frame delivered by the transport.
    ///
    /// Nothing is decoded here; frames are processed by [`drain`](Self::drain).
    pub fn enqueue(&mut self, frame: Bytes) -> QueuePressure {
        self.last_activity = Some(Instant::now());
        if self.session.failed {
            trace!(bytes = frame.len(), "frame dropped, session failed");
            return QueuePressure::Accepted;
        }

        let pressure = self.queue.push(frame);
        if pressure == QueuePressure::Saturated && !self.paused {
            if let Some(topic_id) = self.session.topic_id {
                debug!(topic_id, queued = self.queue.len(), "frame queue saturated, pausing transport");
                self.transport.pause(topic_id);
                self.paused = true;
            }
        }
        pressure
    }

    /// Process queued frames, up to `frames_per_drain` when configured.
    ///
    /// Returns the number of frames processed.
    pub fn drain(&mut self) -> Result<usize> {
        let limit = self.config.frames_per_drain.unwrap_or(usize::MAX);
        self.drain_frames(limit)
    }

    /// Process at most one frame; returns whether one was processed
    pub fn drain_one(&mut self) -> Result<bool> {
        Ok(self.drain_frames(1)? == 1)
    }

    fn drain_frames(&mut self, limit: usize) -> Result<usize> {
        if self.session.failed {
            return Err(LoaderError::SessionFailed);
        }
        if self.session.topic_id.is_none() {
            return Err(LoaderError::NotStarted);
        }
        if self.queue.is_empty() {
            self.check_timeout()?;
            return Ok(0);
        }

        let mut processed = 0;
        while processed < limit {
            let Some(frame) = self.queue.pop() else {
                break;
            };
            processed += 1;
            self.resume_if_drained();

            if let Err(err) = self.process_frame(&frame) {
                self.fail(&err);
                return Err(err);
            }
        }
        Ok(processed)
    }

    /// Ask the transport for its state.
    ///
    /// A finished transport with nothing left to decode finishes the session;
    /// a failed transport fails it.
    pub fn poll_transport(&mut self) -> Result<TransportProgress> {
        let topic_id = self.session.topic_id.ok_or(LoaderError::NotStarted)?;
        let progress = self.transport.progress(topic_id);

        match &progress.state {
            TransportState::Finished if self.queue.is_empty() && !self.session.finished => {
                info!(topic_id, title = %progress.title, "transport finished");
                self.session.finished = true;
                self.report_unresolved();
            }
            TransportState::Failed(message) if !self.session.failed => {
                let err = LoaderError::Transport(message.clone());
                self.fail(&err);
                return Err(err);
            }
            _ => {}
        }
        Ok(progress)
    }

    pub fn add_listener(&mut self, listener: impl FnMut(&ProgressEvent) + 'static) -> ListenerId {
        self.progress.add_listener(listener)
    }

    pub fn remove_listener(&mut self, id: ListenerId) -> bool {
        self.progress.remove_listener(id)
    }

    pub fn session(&self) -> SessionState {
        SessionState {
            nr_objects_read: self.progress.nr_objects_read(),
            ..self.session
        }
    }

    pub fn config(&self) -> &LoaderConfig {
        &self.config
    }

    pub fn stats(&self) -> ResolverStats {
        self.resolver.stats()
    }

    pub fn unresolved(&self) -> UnresolvedReport {
        self.resolver.unresolved()
    }

    pub fn resolver(&self) -> &DependencyResolver {
        &self.resolver
    }

    pub fn queued_frames(&self) -> usize {
        self.queue.len()
    }

    /// Whether the transport is currently paused by backpressure
    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn builder(&self) -> &B {
        &self.builder
    }

    pub fn builder_mut(&mut self) -> &mut B {
        &mut self.builder
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    pub fn into_builder(self) -> B {
        self.builder
    }

    fn process_frame(&mut self, frame: &[u8]) -> Result<()> {
        let decoder = FrameDecoder::new(frame)?;
        let header = decoder.header();

        match header.frame_type {
            FrameType::Data => {}
            FrameType::EndOfStream => {
                debug!(topic_id = header.topic_id, "end-of-stream frame");
                return Ok(());
            }
            FrameType::Other(frame_type) => {
                warn!(topic_id = header.topic_id, frame_type, "unknown frame type, frame skipped");
                return Ok(());
            }
        }

        if self.session.topic_id != Some(header.topic_id) {
            debug!(topic_id = header.topic_id, "frame for another topic skipped");
            return Ok(());
        }

        for record in decoder {
            match record {
                Ok(record) => self.handle_record(record),
                Err(err) if !err.is_fatal() => {
                    warn!(topic_id = header.topic_id, error = %err, "rest of frame skipped");
                    self.builder.log(&format!("{err}, rest of frame skipped"));
                    break;
                }
                Err(err) => return Err(err.into()),
            }
        }
        Ok(())
    }

    fn handle_record(&mut self, record: Record) {
        match record {
            Record::Header(header) => self.on_header(header),
            Record::Geometry(geometry) => {
                debug!(
                    geometry_id = geometry.geometry_id,
                    reuse_count = geometry.reuse_count,
                    vertices = geometry.mesh.vertex_count(),
                    "geometry record"
                );
                self.resolver.on_geometry(geometry, &mut self.builder);
                self.progress.emit(ProgressPhase::Progress);
            }
            Record::Object(object) => {
                debug!(
                    geometry_info_id = object.geometry_info_id,
                    geometry_id = object.geometry_id,
                    ifc_type = %object.ifc_type,
                    transparent = object.transparent,
                    "object record"
                );
                self.progress.object_read();
                self.resolver.on_object(object, &mut self.builder);
                self.progress.emit(ProgressPhase::Progress);
            }
            Record::MinimalObject(object) => {
                debug!(
                    geometry_info_id = object.geometry_info_id,
                    geometry_id = object.geometry_id,
                    "minimal object record discarded"
                );
            }
            Record::MultiPartGeometry(geometry) => {
                debug!(
                    geometry_id = geometry.geometry_id,
                    parts = geometry.parts.len(),
                    "multi-part geometry record discarded"
                );
            }
            Record::End => self.on_end(),
        }
    }

    fn on_header(&mut self, header: StreamHeader) {
        if self.session.started {
            warn!(version = header.version, "repeated stream header");
        }
        info!(
            version = header.version,
            scale_factor = ?header.scale_factor,
            "stream header"
        );
        if header.boundary.has_large_coordinates() {
            debug!("model boundary has large coordinates");
        }
        self.session.protocol_version = Some(header.version);
        self.session.started = true;
        self.builder.model_boundary(&header.boundary);
        self.progress.emit(ProgressPhase::Start);
    }

    fn on_end(&mut self) {
        self.session.finished = true;
        self.progress.emit(ProgressPhase::Done);
        if let Some(topic_id) = self.session.topic_id {
            self.transport.cleanup(topic_id);
        }

        let stats = self.resolver.stats();
        info!(
            objects = self.progress.nr_objects_read(),
            geometries = stats.geometries_received,
            entities = stats.entities_created,
            "geometry loading done"
        );
        self.report_unresolved();
    }

    fn report_unresolved(&mut self) {
        let report = self.resolver.unresolved();
        if !report.is_empty() {
            warn!(
                waiting_objects = report.waiting_objects,
                pending_geometries = report.pending_geometries,
                "session ended with unresolved records"
            );
            self.builder.log(&format!(
                "{} objects still waiting for geometry, {} geometries never used",
                report.waiting_objects, report.pending_geometries
            ));
        }
    }

    fn resume_if_drained(&mut self) {
        if self.paused && self.queue.can_resume() {
            if let Some(topic_id) = self.session.topic_id {
                debug!(topic_id, queued = self.queue.len(), "resuming transport");
                self.transport.resume(topic_id);
            }
            self.paused = false;
        }
    }

    fn check_timeout(&mut self) -> Result<()> {
        let Some(timeout) = self.config.session_timeout() else {
            return Ok(());
        };
        if self.session.finished {
            return Ok(());
        }
        let idle = self.last_activity.map(|at| at.elapsed()).unwrap_or_default();
        if idle > timeout {
            let err = LoaderError::SessionTimeout(timeout);
            self.fail(&err);
            return Err(err);
        }
        Ok(())
    }

    fn fail(&mut self, err: &LoaderError) {
        error!(topic_id = ?self.session.topic_id, error = %err, "geometry loading failed");
        self.builder.error(&err.to_string());
        self.session.failed = true;
        self.queue.clear();
    }
}

impl<B, T> std::fmt::Debug for GeometryLoader<B, T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeometryLoader")
            .field("session", &self.session)
            .field("queued_frames", &self.queue.len())
            .field("paused", &self.paused)
            .finish_non_exhaustive()
    }
}
