// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Geometry/object dependency resolution
//!
//! Geometry records and the object records referencing them arrive in any
//! order. Each geometry id moves through one state:
//!
//! ```text
//! Unseen ──object──▶ ObjectsWaiting ──single-use geometry──▶ (resolved, removed)
//!   │                      │
//!   │                      └──multi-use geometry──▶ LoadedMultiUse
//!   ├──single-use geometry──▶ PendingSingleUse ──object──▶ (resolved, removed)
//!   └──multi-use geometry───▶ LoadedMultiUse (objects resolve on arrival, never removed)
//! ```
//!
//! Classification is fixed by the geometry record (`reuse_count > 1` is
//! multi-use). Every object record that translates to an object id produces
//! exactly one mesh and one entity.

use ifc_stream_core::{GeometryId, GeometryRecord, Matrix4, Mesh, ObjectRecord};
use rustc_hash::FxHashMap;
use smallvec::{smallvec, SmallVec};
use tracing::{debug, trace, warn};

use crate::builder::{MeshId, ModelBuilder, ObjectId};
use crate::defaults::TypeDefaults;

/// Caller-supplied `externalGeometryInfoId → objectId` table
pub type TranslationTable = FxHashMap<u64, ObjectId>;

/// Object parked until its geometry arrives
#[derive(Debug, Clone)]
struct WaitingObject {
    object_id: ObjectId,
    ifc_type: String,
    matrix: Matrix4<f64>,
}

/// Single-use geometry parked until its one consumer arrives
#[derive(Debug, Clone)]
struct PendingGeometry {
    mesh: Mesh,
    color: Option<[f32; 4]>,
}

#[derive(Debug)]
enum GeometryState {
    /// Objects arrived first; almost always exactly one
    ObjectsWaiting(SmallVec<[WaitingObject; 1]>),
    PendingSingleUse(PendingGeometry),
    /// Materialized via `create_geometry`; stays for the whole session
    LoadedMultiUse { color: Option<[f32; 4]> },
}

/// What a record did to the resolver state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// Parked, waiting for the counterpart record
    Parked,
    /// This many entities were created
    Resolved(usize),
    /// Object whose geometry-info id has no translation
    Dropped,
    /// Duplicate geometry record, ignored
    Ignored,
}

/// Counters for diagnostics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResolverStats {
    pub geometries_received: usize,
    pub multi_use_geometries: usize,
    pub objects_received: usize,
    pub missing_translations: usize,
    pub entities_created: usize,
    pub duplicate_geometries: usize,
}

/// Records still parked, typically reported at session end
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UnresolvedReport {
    pub waiting_objects: usize,
    pub pending_geometries: usize,
}

impl UnresolvedReport {
    pub fn is_empty(&self) -> bool {
        self.waiting_objects == 0 && self.pending_geometries == 0
    }
}

/// State machine reconciling geometry and object records
#[derive(Debug)]
pub struct DependencyResolver {
    translation: TranslationTable,
    defaults: TypeDefaults,
    geometries: FxHashMap<GeometryId, GeometryState>,
    next_mesh_id: MeshId,
    stats: ResolverStats,
}

impl DependencyResolver {
    pub fn new(translation: TranslationTable, defaults: TypeDefaults) -> Self {
        Self {
            translation,
            defaults,
            geometries: FxHashMap::default(),
            next_mesh_id: 1,
            stats: ResolverStats::default(),
        }
    }

    pub fn stats(&self) -> ResolverStats {
        self.stats
    }

    pub fn translation(&self) -> &TranslationTable {
        &self.translation
    }

    pub fn defaults(&self) -> &TypeDefaults {
        &self.defaults
    }

    /// Handle a geometry record
    pub fn on_geometry<B: ModelBuilder + ?Sized>(
        &mut self,
        record: GeometryRecord,
        builder: &mut B,
    ) -> Resolution {
        let multi_use = record.is_multi_use();
        let GeometryRecord {
            geometry_id,
            reuse_count,
            mesh,
            color,
        } = record;
        self.stats.geometries_received += 1;

        let waiting = match self.geometries.remove(&geometry_id) {
            None => SmallVec::new(),
            Some(GeometryState::ObjectsWaiting(objects)) => objects,
            Some(state) => {
                // One geometry record per id; keep the first
                warn!(geometry_id, "duplicate geometry record ignored");
                self.geometries.insert(geometry_id, state);
                self.stats.duplicate_geometries += 1;
                return Resolution::Ignored;
            }
        };

        if multi_use {
            self.stats.multi_use_geometries += 1;
            debug!(
                geometry_id,
                reuse_count,
                waiting = waiting.len(),
                "multi-use geometry loaded"
            );
            builder.create_geometry(geometry_id, mesh);
            self.geometries
                .insert(geometry_id, GeometryState::LoadedMultiUse { color });

            let resolved = waiting.len();
            for object in waiting {
                self.instance(builder, geometry_id, color, object);
            }
            return if resolved == 0 {
                Resolution::Parked
            } else {
                Resolution::Resolved(resolved)
            };
        }

        match waiting.len() {
            0 => {
                trace!(geometry_id, "single-use geometry parked");
                self.geometries.insert(
                    geometry_id,
                    GeometryState::PendingSingleUse(PendingGeometry { mesh, color }),
                );
                Resolution::Parked
            }
            1 => {
                if let Some(object) = waiting.into_iter().next() {
                    self.specify(builder, mesh, color, object);
                }
                Resolution::Resolved(1)
            }
            n => {
                // Protocol guarantees a single consumer; don't leave objects without an entity
                warn!(
                    geometry_id,
                    consumers = n,
                    "single-use geometry referenced by several objects"
                );
                for object in waiting {
                    self.specify(builder, mesh.clone(), color, object);
                }
                Resolution::Resolved(n)
            }
        }
    }

    /// Handle an object record
    pub fn on_object<B: ModelBuilder + ?Sized>(
        &mut self,
        record: ObjectRecord,
        builder: &mut B,
    ) -> Resolution {
        self.stats.objects_received += 1;

        let Some(&object_id) = self.translation.get(&record.geometry_info_id) else {
            // The server may describe geometry infos this client never asked for
            trace!(
                geometry_info_id = record.geometry_info_id,
                "no object id for geometry info, dropped"
            );
            self.stats.missing_translations += 1;
            return Resolution::Dropped;
        };

        let geometry_id = record.geometry_id;
        let object = WaitingObject {
            object_id,
            ifc_type: record.ifc_type,
            matrix: record.matrix,
        };

        match self.geometries.get_mut(&geometry_id) {
            Some(GeometryState::LoadedMultiUse { color }) => {
                let color = *color;
                self.instance(builder, geometry_id, color, object);
                Resolution::Resolved(1)
            }
            Some(GeometryState::ObjectsWaiting(objects)) => {
                if let Some(existing) = objects.iter_mut().find(|o| o.object_id == object_id) {
                    warn!(object_id, geometry_id, "object record repeated while waiting");
                    *existing = object;
                } else {
                    objects.push(object);
                }
                Resolution::Parked
            }
            Some(GeometryState::PendingSingleUse(_)) => {
                if let Some(GeometryState::PendingSingleUse(pending)) =
                    self.geometries.remove(&geometry_id)
                {
                    self.specify(builder, pending.mesh, pending.color, object);
                }
                Resolution::Resolved(1)
            }
            None => {
                trace!(object_id, geometry_id, "object waiting for geometry");
                self.geometries
                    .insert(geometry_id, GeometryState::ObjectsWaiting(smallvec![object]));
                Resolution::Parked
            }
        }
    }

    /// Whether `geometry_id` is materialized for instancing
    pub fn is_loaded_multi_use(&self, geometry_id: GeometryId) -> bool {
        matches!(
            self.geometries.get(&geometry_id),
            Some(GeometryState::LoadedMultiUse { .. })
        )
    }

    /// Whether a single-use payload for `geometry_id` is parked
    pub fn has_pending_geometry(&self, geometry_id: GeometryId) -> bool {
        matches!(
            self.geometries.get(&geometry_id),
            Some(GeometryState::PendingSingleUse(_))
        )
    }

    /// Objects parked on `geometry_id`
    pub fn waiting_objects(&self, geometry_id: GeometryId) -> usize {
        match self.geometries.get(&geometry_id) {
            Some(GeometryState::ObjectsWaiting(objects)) => objects.len(),
            _ => 0,
        }
    }

    pub fn loaded_multi_use_count(&self) -> usize {
        self.geometries
            .values()
            .filter(|s| matches!(s, GeometryState::LoadedMultiUse { .. }))
            .count()
    }

    /// Count everything still parked
    pub fn unresolved(&self) -> UnresolvedReport {
        let mut report = UnresolvedReport::default();
        for state in self.geometries.values() {
            match state {
                GeometryState::ObjectsWaiting(objects) => report.waiting_objects += objects.len(),
                GeometryState::PendingSingleUse(_) => report.pending_geometries += 1,
                GeometryState::LoadedMultiUse { .. } => {}
            }
        }
        report
    }

    fn allocate_mesh_id(&mut self) -> MeshId {
        let id = self.next_mesh_id;
        self.next_mesh_id += 1;
        id
    }

    fn instance<B: ModelBuilder + ?Sized>(
        &mut self,
        builder: &mut B,
        geometry_id: GeometryId,
        color: Option<[f32; 4]>,
        object: WaitingObject,
    ) {
        let appearance = self.defaults.appearance(color, &object.ifc_type);
        let mesh_id = self.allocate_mesh_id();
        builder.create_mesh_instancing_geometry(mesh_id, geometry_id, &object.matrix, appearance);
        builder.create_entity(object.object_id, mesh_id, &object.ifc_type);
        self.stats.entities_created += 1;
    }

    fn specify<B: ModelBuilder + ?Sized>(
        &mut self,
        builder: &mut B,
        mesh: Mesh,
        color: Option<[f32; 4]>,
        object: WaitingObject,
    ) {
        let appearance = self.defaults.appearance(color, &object.ifc_type);
        let mesh_id = self.allocate_mesh_id();
        builder.create_mesh_specifying_geometry(mesh_id, mesh, &object.matrix, appearance);
        builder.create_entity(object.object_id, mesh_id, &object.ifc_type);
        self.stats.entities_created += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::{Appearance, BuilderCall, RecordingBuilder};
    use ifc_stream_core::Vector3;

    fn geometry(id: GeometryId, reuse_count: i32, color: Option<[f32; 4]>) -> GeometryRecord {
        GeometryRecord {
            geometry_id: id,
            reuse_count,
            mesh: Mesh::from_parts(
                vec![0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0],
                vec![0.0, 0.0, 1.0, 0.0, 0.0, 1.0, 0.0, 0.0, 1.0],
                vec![0, 1, 2],
            ),
            color,
        }
    }

    fn object(info_id: u64, geometry_id: GeometryId, ifc_type: &str) -> ObjectRecord {
        ObjectRecord {
            geometry_info_id: info_id,
            ifc_type: ifc_type.to_string(),
            transparent: false,
            geometry_id,
            matrix: Matrix4::new_translation(&Vector3::new(info_id as f64, 0.0, 0.0)),
        }
    }

    fn resolver(info_ids: &[u64]) -> DependencyResolver {
        let translation = info_ids.iter().map(|&id| (id, id + 1000)).collect();
        DependencyResolver::new(translation, TypeDefaults::new())
    }

    #[test]
    fn test_single_use_object_first() {
        let mut resolver = resolver(&[1]);
        let mut builder = RecordingBuilder::new();

        assert_eq!(resolver.on_object(object(1, 42, "IfcWall"), &mut builder), Resolution::Parked);
        assert_eq!(resolver.waiting_objects(42), 1);
        assert!(builder.calls.is_empty());

        assert_eq!(
            resolver.on_geometry(geometry(42, 1, None), &mut builder),
            Resolution::Resolved(1)
        );
        assert_eq!(builder.calls.len(), 2);
        assert!(matches!(
            &builder.calls[0],
            BuilderCall::CreateMeshSpecifyingGeometry { mesh_id: 1, matrix, .. }
                if matrix[(0, 3)] == 1.0
        ));
        assert_eq!(
            builder.calls[1],
            BuilderCall::CreateEntity {
                object_id: 1001,
                mesh_id: 1,
                ifc_type: "IfcWall".into()
            }
        );
        assert!(resolver.unresolved().is_empty());
    }

    #[test]
    fn test_single_use_geometry_first() {
        let mut resolver = resolver(&[1]);
        let mut builder = RecordingBuilder::new();

        assert_eq!(resolver.on_geometry(geometry(42, 1, None), &mut builder), Resolution::Parked);
        assert!(resolver.has_pending_geometry(42));
        assert_eq!(resolver.unresolved().pending_geometries, 1);

        assert_eq!(
            resolver.on_object(object(1, 42, "IfcSlab"), &mut builder),
            Resolution::Resolved(1)
        );
        assert!(!resolver.has_pending_geometry(42));
        assert_eq!(builder.calls.len(), 2);

        // Payload is consumed; a stray second object parks instead of reusing it
        resolver.translation.insert(2, 1002);
        assert_eq!(resolver.on_object(object(2, 42, "IfcSlab"), &mut builder), Resolution::Parked);
        assert_eq!(builder.calls.len(), 2);
    }

    #[test]
    fn test_multi_use_resolves_waiting_then_later_objects() {
        let mut resolver = resolver(&[1, 2, 3]);
        let mut builder = RecordingBuilder::new();

        resolver.on_object(object(1, 7, "IfcColumn"), &mut builder);
        resolver.on_object(object(2, 7, "IfcColumn"), &mut builder);
        assert_eq!(
            resolver.on_geometry(geometry(7, 3, None), &mut builder),
            Resolution::Resolved(2)
        );
        assert!(resolver.is_loaded_multi_use(7));
        assert!(matches!(
            builder.calls[0],
            BuilderCall::CreateGeometry { geometry_id: 7, .. }
        ));

        assert_eq!(
            resolver.on_object(object(3, 7, "IfcColumn"), &mut builder),
            Resolution::Resolved(1)
        );
        let instanced = builder.count(|c| {
            matches!(
                c,
                BuilderCall::CreateMeshInstancingGeometry { geometry_id: 7, .. }
            )
        });
        let entities = builder.count(|c| matches!(c, BuilderCall::CreateEntity { .. }));
        assert_eq!(instanced, 3);
        assert_eq!(entities, 3);
        assert_eq!(resolver.loaded_multi_use_count(), 1);
        assert!(resolver.unresolved().is_empty());
    }

    #[test]
    fn test_missing_translation_is_dropped_and_counted() {
        let mut resolver = resolver(&[]);
        let mut builder = RecordingBuilder::new();
        assert_eq!(resolver.on_object(object(9, 1, "IfcWall"), &mut builder), Resolution::Dropped);
        assert_eq!(resolver.stats().missing_translations, 1);
        assert_eq!(resolver.waiting_objects(1), 0);
        assert!(builder.calls.is_empty());
    }

    #[test]
    fn test_duplicate_geometry_is_ignored() {
        let mut resolver = resolver(&[1]);
        let mut builder = RecordingBuilder::new();
        resolver.on_geometry(geometry(5, 2, None), &mut builder);
        assert_eq!(resolver.on_geometry(geometry(5, 1, None), &mut builder), Resolution::Ignored);
        // Classification of the first record holds
        assert!(resolver.is_loaded_multi_use(5));
        assert_eq!(resolver.stats().duplicate_geometries, 1);
        assert_eq!(builder.calls.len(), 1);
    }

    #[test]
    fn test_repeated_waiting_object_resolves_once() {
        let mut resolver = resolver(&[1]);
        let mut builder = RecordingBuilder::new();
        resolver.on_object(object(1, 4, "IfcWall"), &mut builder);
        resolver.on_object(object(1, 4, "IfcWallStandardCase"), &mut builder);
        assert_eq!(resolver.waiting_objects(4), 1);

        resolver.on_geometry(geometry(4, 1, None), &mut builder);
        assert_eq!(builder.count(|c| matches!(c, BuilderCall::CreateEntity { .. })), 1);
        assert!(builder.calls.contains(&BuilderCall::CreateEntity {
            object_id: 1001,
            mesh_id: 1,
            ifc_type: "IfcWallStandardCase".into()
        }));
    }

    #[test]
    fn test_single_use_with_several_waiting_objects_resolves_all() {
        let mut resolver = resolver(&[1, 2]);
        let mut builder = RecordingBuilder::new();
        resolver.on_object(object(1, 8, "IfcPlate"), &mut builder);
        resolver.on_object(object(2, 8, "IfcPlate"), &mut builder);
        assert_eq!(
            resolver.on_geometry(geometry(8, 1, None), &mut builder),
            Resolution::Resolved(2)
        );
        assert_eq!(
            builder.count(|c| matches!(c, BuilderCall::CreateMeshSpecifyingGeometry { .. })),
            2
        );
    }

    #[test]
    fn test_color_policy_is_symmetric() {
        let explicit = [0.2, 0.4, 0.6, 0.5];
        let mut defaults = TypeDefaults::new();
        defaults.insert("IfcWindow", [0.0, 0.0, 1.0, 1.0], 0.3);

        let appearances = |color: Option<[f32; 4]>,
                           ifc_type: &str,
                           reuse_count: i32,
                           geometry_first: bool| {
            let translation = [(1u64, 1u64)].into_iter().collect();
            let mut resolver = DependencyResolver::new(translation, defaults.clone());
            let mut builder = RecordingBuilder::new();
            if geometry_first {
                resolver.on_geometry(geometry(3, reuse_count, color), &mut builder);
                resolver.on_object(object(1, 3, ifc_type), &mut builder);
            } else {
                resolver.on_object(object(1, 3, ifc_type), &mut builder);
                resolver.on_geometry(geometry(3, reuse_count, color), &mut builder);
            }
            let meshes: Vec<Appearance> = builder
                .calls
                .iter()
                .filter_map(|c| match c {
                    BuilderCall::CreateMeshSpecifyingGeometry { appearance, .. }
                        if reuse_count <= 1 =>
                    {
                        Some(*appearance)
                    }
                    BuilderCall::CreateMeshInstancingGeometry { appearance, .. }
                        if reuse_count > 1 =>
                    {
                        Some(*appearance)
                    }
                    _ => None,
                })
                .collect();
            assert_eq!(meshes.len(), 1, "{:?}", builder.calls);
            meshes[0]
        };

        // Embedded and instanced meshes follow the same policy in either order
        for reuse_count in [1, 2] {
            for geometry_first in [true, false] {
                assert_eq!(
                    appearances(Some(explicit), "IfcWindow", reuse_count, geometry_first),
                    Appearance::new(explicit, 0.5)
                );
                assert_eq!(
                    appearances(None, "IfcWindow", reuse_count, geometry_first),
                    Appearance::new([0.0, 0.0, 1.0, 1.0], 0.3)
                );
                assert_eq!(
                    appearances(None, "IfcWall", reuse_count, geometry_first),
                    Appearance::OPAQUE_WHITE
                );
            }
        }
    }
}
