// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! # IFC-Stream Loader
//!
//! Incremental loading of streamed IFC geometry. Geometry records and the
//! object records referencing them may arrive in any order; the loader
//! reconciles them and drives a [`ModelBuilder`] with exactly one mesh and one
//! entity per object.
//!
//! ## Overview
//!
//! - **Resolver**: geometry/object state machine, single-use and instanced paths
//! - **Queue**: frame FIFO with backpressure watermarks
//! - **Progress**: `Start`/`Progress`/`Done` listeners
//! - **Loader**: one session over a [`Transport`]
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use ifc_stream_loader::{GeometryLoader, LoaderConfig, RecordingBuilder, TypeDefaults};
//!
//! let mut loader = GeometryLoader::new(
//!     LoaderConfig::from_env(),
//!     RecordingBuilder::new(),
//!     transport,
//!     translation,
//!     TypeDefaults::standard(),
//! );
//! loader.start()?;
//! // transport frame callback:
//! loader.enqueue(frame);
//! // once per render tick:
//! loader.drain_one()?;
//! ```

pub mod builder;
pub mod config;
pub mod defaults;
pub mod error;
pub mod loader;
pub mod progress;
pub mod queue;
pub mod resolver;
pub mod transport;

pub use builder::{Appearance, BuilderCall, MeshId, ModelBuilder, ObjectId, RecordingBuilder};
pub use config::LoaderConfig;
pub use defaults::{TypeDefault, TypeDefaults};
pub use error::{LoaderError, Result};
pub use loader::{GeometryLoader, SessionState};
pub use progress::{ListenerId, ProgressEvent, ProgressPhase, ProgressTracker};
pub use queue::{FrameQueue, QueuePressure};
pub use resolver::{
    DependencyResolver, Resolution, ResolverStats, TranslationTable, UnresolvedReport,
};
pub use transport::{TopicId, Transport, TransportProgress, TransportState};
