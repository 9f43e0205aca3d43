// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Geometry adapter over a model store.
//!
//! Resolves world bounding boxes, duct cross-sections and port orientations
//! for elements, converting model length units to metres. Every result is
//! cached per element for the lifetime of the adapter, so one analysis run
//! queries the store at most once per element.

use std::f64::consts::PI;

use ifc_lite_hvac_model::{BoundingBox, ElementKind, GlobalId, ModelStore, ProfileDef};
use nalgebra::Vector3;
use rustc_hash::FxHashMap;
use serde::Serialize;

/// Shape of a duct cross-section, dimensions in metres
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub enum DuctShape {
    Circular { diameter: f64 },
    Rectangular { width: f64, height: f64 },
}

/// Dimensional data of a straight duct segment, in metres
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DuctGeometry {
    pub shape: DuctShape,
    /// Cross-sectional area (m²)
    pub area: f64,
    /// Length along the flow (m)
    pub length: f64,
    /// Hydraulic diameter (m)
    pub hydraulic_diameter: f64,
}

impl DuctGeometry {
    /// Circular duct of the given diameter and length.
    ///
    /// Returns `None` unless both are finite and positive.
    pub fn circular(diameter: f64, length: f64) -> Option<Self> {
        if !is_positive(diameter) || !is_positive(length) {
            return None;
        }
        Some(Self {
            shape: DuctShape::Circular { diameter },
            area: PI * diameter * diameter / 4.0,
            length,
            // 4A / P collapses to the diameter
            hydraulic_diameter: diameter,
        })
    }

    /// Rectangular duct of the given cross-section and length.
    ///
    /// Returns `None` unless all dimensions are finite and positive.
    pub fn rectangular(width: f64, height: f64, length: f64) -> Option<Self> {
        if !is_positive(width) || !is_positive(height) || !is_positive(length) {
            return None;
        }
        Some(Self {
            shape: DuctShape::Rectangular { width, height },
            area: width * height,
            length,
            hydraulic_diameter: 2.0 * width * height / (width + height),
        })
    }
}

#[inline]
fn is_positive(value: f64) -> bool {
    value.is_finite() && value > 0.0
}

/// Classification of a two-port duct fitting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum FittingShape {
    Straight,
    Bend,
}

/// Round to two decimals
#[inline]
pub(crate) fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Unit vector from the first to the second port, rounded to two decimals.
///
/// Only defined for elements with exactly two ports at distinct positions.
pub fn port_orientation(store: &dyn ModelStore, id: &GlobalId) -> Option<Vector3<f64>> {
    let ports = store.ports_of(id);
    if ports.len() != 2 {
        return None;
    }
    let direction = ports[1].position - ports[0].position;
    let norm = direction.norm();
    if !is_positive(norm) {
        return None;
    }
    Some((direction / norm).map(round2))
}

/// A fitting is straight when every rounded component of its port
/// orientation is exactly 0 or 1, a bend otherwise.
pub fn classify_fitting(orientation: &Vector3<f64>) -> FittingShape {
    if orientation.iter().all(|&c| c == 0.0 || c == 1.0) {
        FittingShape::Straight
    } else {
        FittingShape::Bend
    }
}

/// Cached geometry queries against one model store
pub struct GeometryAdapter<'a> {
    store: &'a dyn ModelStore,
    boxes: FxHashMap<GlobalId, Option<BoundingBox>>,
    ducts: FxHashMap<GlobalId, Option<DuctGeometry>>,
}

impl<'a> GeometryAdapter<'a> {
    pub fn new(store: &'a dyn ModelStore) -> Self {
        Self {
            store,
            boxes: FxHashMap::default(),
            ducts: FxHashMap::default(),
        }
    }

    pub fn store(&self) -> &'a dyn ModelStore {
        self.store
    }

    /// World bounding box of an element, `None` when it has no geometry.
    pub fn bounding_box(&mut self, id: &GlobalId) -> Option<BoundingBox> {
        let store = self.store;
        *self
            .boxes
            .entry(id.clone())
            .or_insert_with(|| store.world_bounding_box(id))
    }

    /// Dimensional data of a duct segment.
    ///
    /// Anything that is not a duct segment with a circular or rectangular
    /// swept profile has no dimensional data.
    pub fn duct_geometry(&mut self, id: &GlobalId) -> Option<DuctGeometry> {
        if let Some(cached) = self.ducts.get(id) {
            return *cached;
        }
        let geometry = self.resolve_duct(id);
        self.ducts.insert(id.clone(), geometry);
        geometry
    }

    /// Rectangle profiles are read as the duct cross-section (`x_dim` by
    /// `y_dim`) swept along `depth`. Older plan-footprint readings took the
    /// smaller side as width, `depth` as height and the larger side as
    /// length; sections and losses differ from those figures.
    fn resolve_duct(&self, id: &GlobalId) -> Option<DuctGeometry> {
        let element = self.store.element(id)?;
        if element.kind != ElementKind::DuctSegment {
            return None;
        }
        let Some(profile) = self.store.profile_geometry(id) else {
            tracing::warn!(element = %id, "duct segment has no swept profile");
            return None;
        };

        let scale = self.store.length_unit_scale();
        let length = profile.depth * scale;
        let geometry = match profile.profile {
            ProfileDef::Circle { radius } => DuctGeometry::circular(2.0 * radius * scale, length),
            ProfileDef::Rectangle { x_dim, y_dim } => {
                DuctGeometry::rectangular(x_dim * scale, y_dim * scale, length)
            }
            ProfileDef::Other { ref name } => {
                tracing::warn!(element = %id, profile = %name, "unsupported duct profile");
                return None;
            }
        };
        if geometry.is_none() {
            tracing::warn!(element = %id, "duct segment has degenerate dimensions");
        }
        geometry
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ifc_lite_hvac_model::{Element, ModelSnapshot, Point3, Port, ProfileGeometry};

    fn duct(id: &str, profile: ProfileDef, depth: f64) -> Element {
        let mut element = Element::new(id, "IfcDuctSegment");
        element.profile = Some(ProfileGeometry { profile, depth });
        element
    }

    fn fitting(id: &str) -> Element {
        Element::new(id, "IfcDuctFitting")
    }

    fn with_ports(mut element: Element, a: [f64; 3], b: [f64; 3]) -> Element {
        element.ports = vec![
            Port { name: None, position: Point3::from(a) },
            Port { name: None, position: Point3::from(b) },
        ];
        element
    }

    #[test]
    fn circular_duct_in_millimetres() {
        let mut snapshot = ModelSnapshot::new(0.001);
        snapshot
            .add_element(duct("d", ProfileDef::Circle { radius: 100.0 }, 2500.0))
            .unwrap();
        let mut adapter = GeometryAdapter::new(&snapshot);

        let geometry = adapter.duct_geometry(&GlobalId::from("d")).unwrap();
        assert!(matches!(geometry.shape, DuctShape::Circular { .. }));
        assert_relative_eq!(geometry.area, PI * 0.01, max_relative = 1e-12);
        assert_relative_eq!(geometry.length, 2.5, max_relative = 1e-12);
        assert_relative_eq!(geometry.hydraulic_diameter, 0.2, max_relative = 1e-12);
    }

    #[test]
    fn rectangular_hydraulic_diameter() {
        let geometry = DuctGeometry::rectangular(0.4, 0.2, 1.0).unwrap();
        assert_relative_eq!(geometry.area, 0.08, max_relative = 1e-12);
        assert_relative_eq!(geometry.hydraulic_diameter, 2.0 * 0.4 * 0.2 / 0.6);
    }

    #[test]
    fn rectangle_profile_is_the_cross_section() {
        let mut snapshot = ModelSnapshot::new(0.001);
        snapshot
            .add_element(duct("r", ProfileDef::Rectangle { x_dim: 500.0, y_dim: 300.0 }, 4000.0))
            .unwrap();
        let mut adapter = GeometryAdapter::new(&snapshot);

        let geometry = adapter.duct_geometry(&GlobalId::from("r")).unwrap();
        assert!(matches!(geometry.shape, DuctShape::Rectangular { .. }));
        assert_relative_eq!(geometry.area, 0.15, max_relative = 1e-12);
        assert_relative_eq!(geometry.length, 4.0, max_relative = 1e-12);
        assert_relative_eq!(geometry.hydraulic_diameter, 0.375, max_relative = 1e-12);
    }

    #[test]
    fn degenerate_dimensions_have_no_geometry() {
        assert!(DuctGeometry::circular(0.0, 1.0).is_none());
        assert!(DuctGeometry::rectangular(0.4, 0.2, 0.0).is_none());
        assert!(DuctGeometry::rectangular(f64::NAN, 0.2, 1.0).is_none());
    }

    #[test]
    fn non_segments_and_other_profiles_have_no_geometry() {
        let mut snapshot = ModelSnapshot::new(1.0);
        let mut fitting = Element::new("f", "IfcDuctFitting");
        fitting.profile = Some(ProfileGeometry {
            profile: ProfileDef::Circle { radius: 0.1 },
            depth: 1.0,
        });
        snapshot.add_element(fitting).unwrap();
        snapshot
            .add_element(duct("o", ProfileDef::Other { name: "IfcEllipseProfileDef".into() }, 1.0))
            .unwrap();

        let mut adapter = GeometryAdapter::new(&snapshot);
        assert!(adapter.duct_geometry(&GlobalId::from("f")).is_none());
        assert!(adapter.duct_geometry(&GlobalId::from("o")).is_none());
        assert!(adapter.duct_geometry(&GlobalId::from("missing")).is_none());
    }

    #[test]
    fn orientation_is_rounded_unit_vector() {
        let mut snapshot = ModelSnapshot::new(1.0);
        snapshot
            .add_element(with_ports(fitting("s"), [0.0, 0.0, 0.0], [0.0, 2.0, 0.0]))
            .unwrap();
        snapshot
            .add_element(with_ports(fitting("b"), [0.0, 0.0, 0.0], [1.0, 1.0, 0.0]))
            .unwrap();

        let straight = port_orientation(&snapshot, &GlobalId::from("s")).unwrap();
        assert_eq!(straight, Vector3::new(0.0, 1.0, 0.0));
        assert_eq!(classify_fitting(&straight), FittingShape::Straight);

        let bend = port_orientation(&snapshot, &GlobalId::from("b")).unwrap();
        assert_eq!(bend, Vector3::new(0.71, 0.71, 0.0));
        assert_eq!(classify_fitting(&bend), FittingShape::Bend);
    }

    #[test]
    fn reversed_axis_counts_as_bend() {
        assert_eq!(classify_fitting(&Vector3::new(-1.0, 0.0, 0.0)), FittingShape::Bend);
    }

    #[test]
    fn orientation_needs_exactly_two_ports() {
        let mut snapshot = ModelSnapshot::new(1.0);
        let mut tee = Element::new("t", "IfcDuctFitting");
        tee.ports = vec![
            Port { name: None, position: Point3::new(0.0, 0.0, 0.0) },
            Port { name: None, position: Point3::new(1.0, 0.0, 0.0) },
            Port { name: None, position: Point3::new(0.0, 1.0, 0.0) },
        ];
        snapshot.add_element(tee).unwrap();
        snapshot
            .add_element(with_ports(fitting("z"), [1.0, 1.0, 1.0], [1.0, 1.0, 1.0]))
            .unwrap();

        assert!(port_orientation(&snapshot, &GlobalId::from("t")).is_none());
        assert!(port_orientation(&snapshot, &GlobalId::from("z")).is_none());
    }
}
