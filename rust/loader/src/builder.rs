// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Output side of the loader: the model builder the renderer implements

use ifc_stream_core::{GeometryId, Matrix4, Mesh, ModelBoundary};

/// Internal object id, from the caller's translation table
pub type ObjectId = u64;

/// Mesh id allocated by the resolver, one per entity
pub type MeshId = u64;

/// Resolved color and opacity of a mesh
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Appearance {
    /// RGBA color in 0-1 range
    pub color: [f32; 4],
    pub opacity: f32,
}

impl Appearance {
    pub const OPAQUE_WHITE: Appearance = Appearance {
        color: [1.0, 1.0, 1.0, 1.0],
        opacity: 1.0,
    };

    pub fn new(color: [f32; 4], opacity: f32) -> Self {
        Self { color, opacity }
    }

    /// Inline record color; its alpha is the opacity
    pub fn from_rgba(color: [f32; 4]) -> Self {
        Self {
            color,
            opacity: color[3],
        }
    }

    pub fn is_transparent(&self) -> bool {
        self.opacity < 1.0
    }
}

impl Default for Appearance {
    fn default() -> Self {
        Self::OPAQUE_WHITE
    }
}

/// Receiver of the create-mesh / create-entity sequence
///
/// One implementation per rendering backend. Meshes are handed over by value;
/// the loader keeps no copy after the call.
pub trait ModelBuilder {
    /// World-space boundary from the stream header
    fn model_boundary(&mut self, boundary: &ModelBoundary);

    /// Shared geometry, later referenced by instanced meshes
    fn create_geometry(&mut self, geometry_id: GeometryId, mesh: Mesh);

    /// Mesh instancing a geometry previously passed to [`create_geometry`](Self::create_geometry)
    fn create_mesh_instancing_geometry(
        &mut self,
        mesh_id: MeshId,
        geometry_id: GeometryId,
        matrix: &Matrix4<f64>,
        appearance: Appearance,
    );

    /// Mesh embedding its own single-use geometry
    fn create_mesh_specifying_geometry(
        &mut self,
        mesh_id: MeshId,
        mesh: Mesh,
        matrix: &Matrix4<f64>,
        appearance: Appearance,
    );

    /// Scene entity for an object, backed by one mesh
    fn create_entity(&mut self, object_id: ObjectId, mesh_id: MeshId, ifc_type: &str);

    fn log(&mut self, message: &str) {
        tracing::info!(target: "ifc_stream_loader::builder", "{}", message);
    }

    fn error(&mut self, message: &str) {
        tracing::error!(target: "ifc_stream_loader::builder", "{}", message);
    }
}

/// One call received by a [`RecordingBuilder`]
#[derive(Debug, Clone, PartialEq)]
pub enum BuilderCall {
    ModelBoundary([f64; 6]),
    CreateGeometry {
        geometry_id: GeometryId,
        mesh: Mesh,
    },
    CreateMeshInstancingGeometry {
        mesh_id: MeshId,
        geometry_id: GeometryId,
        matrix: Matrix4<f64>,
        appearance: Appearance,
    },
    CreateMeshSpecifyingGeometry {
        mesh_id: MeshId,
        mesh: Mesh,
        matrix: Matrix4<f64>,
        appearance: Appearance,
    },
    CreateEntity {
        object_id: ObjectId,
        mesh_id: MeshId,
        ifc_type: String,
    },
    Log(String),
    Error(String),
}

/// Builder that records every call, for tests and stream diagnostics
#[derive(Debug, Clone, Default)]
pub struct RecordingBuilder {
    pub calls: Vec<BuilderCall>,
}

impl RecordingBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Calls other than log/error
    pub fn model_calls(&self) -> impl Iterator<Item = &BuilderCall> {
        self.calls
            .iter()
            .filter(|c| !matches!(c, BuilderCall::Log(_) | BuilderCall::Error(_)))
    }

    pub fn errors(&self) -> Vec<&str> {
        self.calls
            .iter()
            .filter_map(|c| match c {
                BuilderCall::Error(msg) => Some(msg.as_str()),
                _ => None,
            })
            .collect()
    }

    pub fn logs(&self) -> Vec<&str> {
        self.calls
            .iter()
            .filter_map(|c| match c {
                BuilderCall::Log(msg) => Some(msg.as_str()),
                _ => None,
            })
            .collect()
    }

    pub fn count(&self, predicate: impl Fn(&BuilderCall) -> bool) -> usize {
        self.calls.iter().filter(|c| predicate(c)).count()
    }
}

impl ModelBuilder for RecordingBuilder {
    fn model_boundary(&mut self, boundary: &ModelBoundary) {
        self.calls.push(BuilderCall::ModelBoundary(boundary.to_aabb()));
    }

    fn create_geometry(&mut self, geometry_id: GeometryId, mesh: Mesh) {
        self.calls.push(BuilderCall::CreateGeometry { geometry_id, mesh });
    }

    fn create_mesh_instancing_geometry(
        &mut self,
        mesh_id: MeshId,
        geometry_id: GeometryId,
        matrix: &Matrix4<f64>,
        appearance: Appearance,
    ) {
        self.calls.push(BuilderCall::CreateMeshInstancingGeometry {
            mesh_id,
            geometry_id,
            matrix: *matrix,
            appearance,
        });
    }

    fn create_mesh_specifying_geometry(
        &mut self,
        mesh_id: MeshId,
        mesh: Mesh,
        matrix: &Matrix4<f64>,
        appearance: Appearance,
    ) {
        self.calls.push(BuilderCall::CreateMeshSpecifyingGeometry {
            mesh_id,
            mesh,
            matrix: *matrix,
            appearance,
        });
    }

    fn create_entity(&mut self, object_id: ObjectId, mesh_id: MeshId, ifc_type: &str) {
        self.calls.push(BuilderCall::CreateEntity {
            object_id,
            mesh_id,
            ifc_type: ifc_type.to_string(),
        });
    }

    fn log(&mut self, message: &str) {
        self.calls.push(BuilderCall::Log(message.to_string()));
    }

    fn error(&mut self, message: &str) {
        self.calls.push(BuilderCall::Error(message.to_string()));
    }
}
