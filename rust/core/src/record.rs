// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Record types of the binary geometry stream
//!
//! Each record starts with a one-byte discriminant ([`RecordKind`]) followed by
//! type-specific fields. Alignment inside a record is relative to the start of
//! the frame, which is how the server's encoder lays records out.

use nalgebra::Matrix4;

use crate::error::{Error, Result};
use crate::mesh::{Mesh, ModelBoundary};
use crate::reader::StreamReader;

/// Server-side geometry data id
pub type GeometryId = u64;

/// Magic string opening every stream
pub const MAGIC: &str = "BGS";

/// Protocol versions this decoder understands
pub const SUPPORTED_VERSIONS: [u8; 7] = [10, 11, 16, 17, 18, 19, 20];

/// Versions above this carry a scale factor after the version byte
pub const LAST_VERSION_WITHOUT_SCALE: u8 = 15;

/// Discriminants the protocol reserves without a known payload layout
pub const RESERVED_KINDS: [u8; 4] = [7, 8, 10, 11];

/// Record discriminant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum RecordKind {
    Header = 0,
    Geometry = 1,
    MultiPartGeometry = 3,
    Object = 5,
    End = 6,
    MinimalObject = 9,
}

impl RecordKind {
    /// Map a wire discriminant to a decodable kind; reserved and unknown values give `None`
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Header),
            1 => Some(Self::Geometry),
            3 => Some(Self::MultiPartGeometry),
            5 => Some(Self::Object),
            6 => Some(Self::End),
            9 => Some(Self::MinimalObject),
            _ => None,
        }
    }

    pub fn as_u8(self) -> u8 {
        self as u8
    }

    /// Whether `value` is one of the reserved discriminants
    pub fn is_reserved(value: u8) -> bool {
        RESERVED_KINDS.contains(&value)
    }
}

/// Stream header: magic, version, optional scale factor and model boundary
#[derive(Debug, Clone, PartialEq)]
pub struct StreamHeader {
    pub version: u8,
    /// Present for versions above 15
    pub scale_factor: Option<f32>,
    pub boundary: ModelBoundary,
}

impl StreamHeader {
    pub fn decode(reader: &mut StreamReader<'_>) -> Result<Self> {
        let magic = reader.read_utf8()?;
        if magic != MAGIC {
            return Err(Error::BadMagic(magic.to_string()));
        }

        let version = reader.read_byte()?;
        if !SUPPORTED_VERSIONS.contains(&version) {
            return Err(Error::UnsupportedVersion(version));
        }

        let scale_factor = if version > LAST_VERSION_WITHOUT_SCALE {
            Some(reader.read_f32()?)
        } else {
            None
        };

        reader.align8()?;
        let boundary = ModelBoundary::from_aabb(read_fixed::<6>(reader)?);

        Ok(Self {
            version,
            scale_factor,
            boundary,
        })
    }
}

/// Geometry data with its reuse count
#[derive(Debug, Clone, PartialEq)]
pub struct GeometryRecord {
    pub geometry_id: GeometryId,
    /// Number of objects referencing this geometry
    pub reuse_count: i32,
    pub mesh: Mesh,
    /// Inline RGBA color, when the server sent one
    pub color: Option<[f32; 4]>,
}

impl GeometryRecord {
    /// Shared geometry rendered through instancing
    #[inline]
    pub fn is_multi_use(&self) -> bool {
        self.reuse_count > 1
    }

    pub fn decode(reader: &mut StreamReader<'_>) -> Result<Self> {
        let reuse_count = reader.read_i32()?;
        reader.align8()?;
        let geometry_id = reader.read_u64()?;
        let indices = read_indices(reader)?;

        let has_color = reader.read_i32()?;
        let color = if has_color == 1 {
            Some(read_fixed_f32::<4>(reader)?)
        } else {
            None
        };

        let nr_positions = reader.read_count()?;
        let positions = reader.read_f32_array(nr_positions)?;
        let nr_normals = reader.read_count()?;
        let normals = reader.read_f32_array(nr_normals)?;

        Ok(Self {
            geometry_id,
            reuse_count,
            mesh: Mesh::from_parts(positions, normals, indices),
            color,
        })
    }
}

/// Object instantiation: which geometry, where, and as what IFC type
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectRecord {
    /// External geometry-info id, translated to an object id by the caller
    pub geometry_info_id: u64,
    pub ifc_type: String,
    pub transparent: bool,
    pub geometry_id: GeometryId,
    /// Object placement, column-major on the wire
    pub matrix: Matrix4<f64>,
}

impl ObjectRecord {
    pub fn decode(reader: &mut StreamReader<'_>) -> Result<Self> {
        let ifc_type = reader.read_utf8()?.to_string();
        let transparent = reader.read_byte()? == 1;
        reader.align8()?;
        let geometry_info_id = reader.read_u64()?;
        let geometry_id = reader.read_u64()?;
        let matrix = Matrix4::from_column_slice(&read_fixed::<16>(reader)?);

        Ok(Self {
            geometry_info_id,
            ifc_type,
            transparent,
            geometry_id,
            matrix,
        })
    }
}

/// Compact object record; decoded to keep the cursor consistent, not rendered
#[derive(Debug, Clone, PartialEq)]
pub struct MinimalObjectRecord {
    pub ifc_type: String,
    pub geometry_info_id: u64,
    pub geometry_id: GeometryId,
}

impl MinimalObjectRecord {
    pub fn decode(reader: &mut StreamReader<'_>) -> Result<Self> {
        let ifc_type = reader.read_utf8()?.to_string();
        reader.align8()?;
        let geometry_info_id = reader.read_u64()?;
        let geometry_id = reader.read_u64()?;
        Ok(Self {
            ifc_type,
            geometry_info_id,
            geometry_id,
        })
    }
}

/// One part of a legacy multi-part geometry
#[derive(Debug, Clone, PartialEq)]
pub struct GeometryPart {
    pub part_id: u64,
    pub mesh: Mesh,
}

/// Legacy geometry split into parts; decoded and discarded
#[derive(Debug, Clone, PartialEq)]
pub struct MultiPartGeometryRecord {
    pub geometry_id: GeometryId,
    pub reuse_count: i32,
    pub parts: Vec<GeometryPart>,
}

impl MultiPartGeometryRecord {
    pub fn decode(reader: &mut StreamReader<'_>) -> Result<Self> {
        let reuse_count = reader.read_i32()?;
        reader.align8()?;
        let geometry_id = reader.read_u64()?;
        let nr_parts = reader.read_count()?;

        // Counts come off the wire; don't trust them for preallocation
        let mut parts = Vec::with_capacity(nr_parts.min(64));
        for _ in 0..nr_parts {
            reader.align8()?;
            let part_id = reader.read_u64()?;
            let indices = read_indices(reader)?;
            let nr_positions = reader.read_count()?;
            let positions = reader.read_f32_array(nr_positions)?;
            let nr_normals = reader.read_count()?;
            let normals = reader.read_f32_array(nr_normals)?;
            parts.push(GeometryPart {
                part_id,
                mesh: Mesh::from_parts(positions, normals, indices),
            });
        }

        Ok(Self {
            geometry_id,
            reuse_count,
            parts,
        })
    }
}

/// A decoded record
#[derive(Debug, Clone, PartialEq)]
pub enum Record {
    Header(StreamHeader),
    Geometry(GeometryRecord),
    MultiPartGeometry(MultiPartGeometryRecord),
    Object(ObjectRecord),
    MinimalObject(MinimalObjectRecord),
    End,
}

impl Record {
    /// Decode one record, discriminant included. Trailing alignment is the caller's job.
    pub fn decode(reader: &mut StreamReader<'_>) -> Result<Self> {
        let offset = reader.position();
        let kind = reader.read_byte()?;
        let kind = RecordKind::from_u8(kind).ok_or(Error::UnsupportedRecord { kind, offset })?;

        Ok(match kind {
            RecordKind::Header => Record::Header(StreamHeader::decode(reader)?),
            RecordKind::Geometry => Record::Geometry(GeometryRecord::decode(reader)?),
            RecordKind::MultiPartGeometry => {
                Record::MultiPartGeometry(MultiPartGeometryRecord::decode(reader)?)
            }
            RecordKind::Object => Record::Object(ObjectRecord::decode(reader)?),
            RecordKind::MinimalObject => Record::MinimalObject(MinimalObjectRecord::decode(reader)?),
            RecordKind::End => Record::End,
        })
    }

    pub fn kind(&self) -> RecordKind {
        match self {
            Record::Header(_) => RecordKind::Header,
            Record::Geometry(_) => RecordKind::Geometry,
            Record::MultiPartGeometry(_) => RecordKind::MultiPartGeometry,
            Record::Object(_) => RecordKind::Object,
            Record::MinimalObject(_) => RecordKind::MinimalObject,
            Record::End => RecordKind::End,
        }
    }
}

/// i32 count, 16-bit indices widened to u32, then align4
fn read_indices(reader: &mut StreamReader<'_>) -> Result<Vec<u32>> {
    let nr_indices = reader.read_count()?;
    let indices = reader
        .read_i16_array(nr_indices)?
        .into_iter()
        // Indices are unsigned on the wire; i16 is only the transport width
        .map(|i| u32::from(i as u16))
        .collect();
    reader.align4()?;
    Ok(indices)
}

fn read_fixed<const N: usize>(reader: &mut StreamReader<'_>) -> Result<[f64; N]> {
    let mut out = [0.0; N];
    for value in out.iter_mut() {
        *value = reader.read_f64()?;
    }
    Ok(out)
}

fn read_fixed_f32<const N: usize>(reader: &mut StreamReader<'_>) -> Result<[f32; N]> {
    let mut out = [0.0; N];
    for value in out.iter_mut() {
        *value = reader.read_f32()?;
    }
    Ok(out)
}
