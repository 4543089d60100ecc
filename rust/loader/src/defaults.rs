// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Per-IFC-type default appearance and the color policy

use rustc_hash::FxHashMap;

use crate::builder::Appearance;

/// Default appearance for one IFC type
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TypeDefault {
    /// RGBA color in 0-1 range
    pub colorize: [f32; 4],
    pub opacity: f32,
}

/// Table of defaults keyed by IFC type name as the server sends it (e.g. `IfcWall`)
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct TypeDefaults {
    types: FxHashMap<String, TypeDefault>,
}

impl TypeDefaults {
    /// Empty table: everything without an inline color renders opaque white
    pub fn new() -> Self {
        Self::default()
    }

    /// Palette for common building element types
    pub fn standard() -> Self {
        const PALETTE: &[(&str, [f32; 4])] = &[
            // Walls - light gray
            ("IfcWall", [0.85, 0.85, 0.85, 1.0]),
            ("IfcWallStandardCase", [0.85, 0.85, 0.85, 1.0]),
            // Slabs - darker gray
            ("IfcSlab", [0.7, 0.7, 0.7, 1.0]),
            // Roofs - brown-ish
            ("IfcRoof", [0.6, 0.5, 0.4, 1.0]),
            // Columns/Beams - steel gray
            ("IfcColumn", [0.6, 0.65, 0.7, 1.0]),
            ("IfcBeam", [0.6, 0.65, 0.7, 1.0]),
            ("IfcMember", [0.6, 0.65, 0.7, 1.0]),
            // Windows - light blue transparent
            ("IfcWindow", [0.6, 0.8, 1.0, 0.4]),
            // Doors - wood brown
            ("IfcDoor", [0.6, 0.45, 0.3, 1.0]),
            ("IfcStair", [0.75, 0.75, 0.75, 1.0]),
            ("IfcRailing", [0.4, 0.4, 0.45, 1.0]),
            ("IfcPlate", [0.8, 0.8, 0.8, 1.0]),
            ("IfcCovering", [0.8, 0.8, 0.8, 1.0]),
            // Curtain walls - glass blue
            ("IfcCurtainWall", [0.5, 0.7, 0.9, 0.5]),
            ("IfcFurnishingElement", [0.7, 0.55, 0.4, 1.0]),
            // Spaces - cyan transparent
            ("IfcSpace", [0.2, 0.85, 1.0, 0.3]),
            ("IfcOpeningElement", [1.0, 0.42, 0.29, 0.4]),
            ("IfcSite", [0.4, 0.8, 0.3, 1.0]),
        ];

        let mut defaults = Self::new();
        for (ifc_type, rgba) in PALETTE {
            defaults.insert(*ifc_type, *rgba, rgba[3]);
        }
        defaults
    }

    pub fn insert(&mut self, ifc_type: impl Into<String>, colorize: [f32; 4], opacity: f32) {
        self.types
            .insert(ifc_type.into(), TypeDefault { colorize, opacity });
    }

    pub fn get(&self, ifc_type: &str) -> Option<&TypeDefault> {
        self.types.get(ifc_type)
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// Color policy shared by every resolution path:
    /// inline record color, else the type default, else opaque white.
    pub fn appearance(&self, explicit: Option<[f32; 4]>, ifc_type: &str) -> Appearance {
        if let Some(color) = explicit {
            return Appearance::from_rgba(color);
        }
        match self.get(ifc_type) {
            Some(default) => Appearance::new(default.colorize, default.opacity),
            None => Appearance::OPAQUE_WHITE,
        }
    }
}
