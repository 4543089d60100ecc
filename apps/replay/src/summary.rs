// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Model builder that only counts what it is asked to build

use std::fmt;

use ifc_stream_core::{GeometryId, Matrix4, Mesh, ModelBoundary};
use ifc_stream_loader::{Appearance, MeshId, ModelBuilder, ObjectId, UnresolvedReport};
use rustc_hash::FxHashMap;
use tracing::debug;

#[derive(Debug, Default)]
pub struct SummaryBuilder {
    pub boundary: Option<ModelBoundary>,
    pub geometries: usize,
    pub instanced_meshes: usize,
    pub specified_meshes: usize,
    pub entities: usize,
    pub transparent_meshes: usize,
    pub triangles: usize,
    pub entities_by_type: FxHashMap<String, usize>,
    pub errors: Vec<String>,
    pub unresolved: UnresolvedReport,
}

impl SummaryBuilder {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ModelBuilder for SummaryBuilder {
    fn model_boundary(&mut self, boundary: &ModelBoundary) {
        let (dx, dy, dz) = boundary.extent();
        debug!(dx, dy, dz, "model boundary");
        self.boundary = Some(*boundary);
    }

    fn create_geometry(&mut self, geometry_id: GeometryId, mesh: Mesh) {
        debug!(geometry_id, triangles = mesh.triangle_count(), "create_geometry");
        self.geometries += 1;
        self.triangles += mesh.triangle_count();
    }

    fn create_mesh_instancing_geometry(
        &mut self,
        mesh_id: MeshId,
        geometry_id: GeometryId,
        _matrix: &Matrix4<f64>,
        appearance: Appearance,
    ) {
        debug!(mesh_id, geometry_id, opacity = appearance.opacity, "create_mesh_instancing_geometry");
        self.instanced_meshes += 1;
        if appearance.is_transparent() {
            self.transparent_meshes += 1;
        }
    }

    fn create_mesh_specifying_geometry(
        &mut self,
        mesh_id: MeshId,
        mesh: Mesh,
        _matrix: &Matrix4<f64>,
        appearance: Appearance,
    ) {
        debug!(
            mesh_id,
            triangles = mesh.triangle_count(),
            opacity = appearance.opacity,
            "create_mesh_specifying_geometry"
        );
        self.specified_meshes += 1;
        self.triangles += mesh.triangle_count();
        if appearance.is_transparent() {
            self.transparent_meshes += 1;
        }
    }

    fn create_entity(&mut self, object_id: ObjectId, mesh_id: MeshId, ifc_type: &str) {
        debug!(object_id, mesh_id, ifc_type, "create_entity");
        self.entities += 1;
        *self.entities_by_type.entry(ifc_type.to_string()).or_default() += 1;
    }

    fn error(&mut self, message: &str) {
        tracing::error!("{}", message);
        self.errors.push(message.to_string());
    }
}

impl fmt::Display for SummaryBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(boundary) = &self.boundary {
            let (dx, dy, dz) = boundary.extent();
            writeln!(f, "boundary:          {dx:.2} x {dy:.2} x {dz:.2}")?;
        }
        writeln!(f, "geometries:        {}", self.geometries)?;
        writeln!(f, "instanced meshes:  {}", self.instanced_meshes)?;
        writeln!(f, "specified meshes:  {}", self.specified_meshes)?;
        writeln!(f, "transparent:       {}", self.transparent_meshes)?;
        writeln!(f, "triangles:         {}", self.triangles)?;
        writeln!(f, "entities:          {}", self.entities)?;

        let mut types: Vec<_> = self.entities_by_type.iter().collect();
        types.sort_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.cmp(b.0)));
        for (ifc_type, count) in types {
            writeln!(f, "  {ifc_type:<24} {count}")?;
        }

        writeln!(f, "waiting objects:   {}", self.unresolved.waiting_objects)?;
        write!(f, "pending geometries: {}", self.unresolved.pending_geometries)?;
        for error in &self.errors {
            write!(f, "\nerror: {error}")?;
        }
        Ok(())
    }
}
