// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! # IFC-Stream Core
//!
//! Decoder for the binary geometry stream (BGS) a model server sends while a
//! client incrementally loads an IFC model.
//!
//! ## Overview
//!
//! - **Reader**: bounds-checked little-endian cursor with 4/8-byte alignment
//! - **Frames**: topic/frame-type envelope and a record iterator
//! - **Records**: stream header, geometry, object and legacy record layouts
//! - **Writer**: the encoding mirror, used for fixtures and captures
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use ifc_stream_core::{FrameDecoder, Record};
//!
//! let decoder = FrameDecoder::new(&frame_bytes)?;
//! for record in decoder {
//!     match record? {
//!         Record::Geometry(geometry) => println!("geometry {}", geometry.geometry_id),
//!         Record::Object(object) => println!("{} -> {}", object.ifc_type, object.geometry_id),
//!         _ => {}
//!     }
//! }
//! ```
//!
//! Reading past the end of a frame is always an error, never a short read.

pub mod error;
pub mod frame;
pub mod mesh;
pub mod reader;
pub mod record;
pub mod writer;

pub use error::{Error, Result};
pub use frame::{FrameDecoder, FrameHeader, FrameType, FRAME_HEADER_SIZE};
pub use mesh::{Mesh, ModelBoundary};
pub use reader::StreamReader;
pub use record::{
    GeometryId, GeometryPart, GeometryRecord, MinimalObjectRecord, MultiPartGeometryRecord,
    ObjectRecord, Record, RecordKind, StreamHeader, MAGIC, SUPPORTED_VERSIONS,
};
pub use writer::StreamWriter;

// Re-export nalgebra types used in the public API
pub use nalgebra::{Matrix4, Point3, Vector3};
