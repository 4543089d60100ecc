// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Mesh and boundary data carried by the stream

use nalgebra::Point3;

/// Triangle mesh payload of a geometry record
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Mesh {
    /// Vertex positions (x, y, z)
    pub positions: Vec<f32>,
    /// Vertex normals (nx, ny, nz)
    pub normals: Vec<f32>,
    /// Triangle indices (i0, i1, i2)
    pub indices: Vec<u32>,
}

impl Mesh {
    /// Create a new empty mesh
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a mesh from its three buffers
    pub fn from_parts(positions: Vec<f32>, normals: Vec<f32>, indices: Vec<u32>) -> Self {
        Self {
            positions,
            normals,
            indices,
        }
    }

    /// Get vertex count
    #[inline]
    pub fn vertex_count(&self) -> usize {
        self.positions.len() / 3
    }

    /// Get triangle count
    #[inline]
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// Check if mesh is empty
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty() || self.indices.is_empty()
    }
}

/// World-space bounding box sent in the stream header, in f64 precision
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ModelBoundary {
    pub min: Point3<f64>,
    pub max: Point3<f64>,
}

impl ModelBoundary {
    /// Build from the wire order `minX, minY, minZ, maxX, maxY, maxZ`
    pub fn from_aabb(aabb: [f64; 6]) -> Self {
        Self {
            min: Point3::new(aabb[0], aabb[1], aabb[2]),
            max: Point3::new(aabb[3], aabb[4], aabb[5]),
        }
    }

    /// Back to the wire order
    pub fn to_aabb(&self) -> [f64; 6] {
        [
            self.min.x, self.min.y, self.min.z, self.max.x, self.max.y, self.max.z,
        ]
    }

    /// Get centroid (center of bounding box)
    #[inline]
    pub fn centroid(&self) -> Point3<f64> {
        nalgebra::center(&self.min, &self.max)
    }

    /// Size along each axis
    #[inline]
    pub fn extent(&self) -> (f64, f64, f64) {
        let d = self.max - self.min;
        (d.x, d.y, d.z)
    }

    /// Check if bounds contain large coordinates (>10km from origin)
    #[inline]
    pub fn has_large_coordinates(&self) -> bool {
        const THRESHOLD: f64 = 10000.0; // 10km
        self.min.coords.iter().chain(self.max.coords.iter()).any(|v| v.abs() > THRESHOLD)
    }
}
