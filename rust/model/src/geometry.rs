// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! World-space bounds and swept profiles of model elements.

use nalgebra::Point3;
use serde::{Deserialize, Serialize};

/// Axis-aligned bounding box in world coordinates (metres)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min: Point3<f64>,
    pub max: Point3<f64>,
}

impl BoundingBox {
    /// Create a box from its corners
    pub fn new(min: [f64; 3], max: [f64; 3]) -> Self {
        Self {
            min: Point3::from(min),
            max: Point3::from(max),
        }
    }

    /// Bounds of a vertex cloud, `None` for an empty cloud
    pub fn from_points<I>(points: I) -> Option<Self>
    where
        I: IntoIterator<Item = Point3<f64>>,
    {
        let mut iter = points.into_iter();
        let first = iter.next()?;
        let mut bounds = Self {
            min: first,
            max: first,
        };
        for p in iter {
            bounds.expand(&p);
        }
        Some(bounds)
    }

    /// Expand bounds to include a point
    #[inline]
    pub fn expand(&mut self, p: &Point3<f64>) {
        self.min = self.min.inf(p);
        self.max = self.max.sup(p);
    }

    /// Check that min <= max on every axis and no coordinate is NaN
    #[inline]
    pub fn is_valid(&self) -> bool {
        (0..3).all(|i| self.min[i] <= self.max[i])
    }

    /// Closed-interval overlap on all three axes.
    ///
    /// Boxes that only touch on a face, edge or corner count as overlapping.
    /// The test is symmetric: `a.overlaps(&b) == b.overlaps(&a)`.
    #[inline]
    pub fn overlaps(&self, other: &BoundingBox) -> bool {
        (0..3).all(|i| self.min[i] <= other.max[i] && self.max[i] >= other.min[i])
    }

    /// Copy of the box with its top raised by `pad`
    pub fn with_padded_max_z(&self, pad: f64) -> Self {
        let mut padded = *self;
        padded.max.z += pad;
        padded
    }

    /// Center of the box
    pub fn centroid(&self) -> Point3<f64> {
        nalgebra::center(&self.min, &self.max)
    }

    /// Extent along Z
    pub fn height(&self) -> f64 {
        self.max.z - self.min.z
    }
}

/// Swept-solid description of an extruded element, in model length units
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileGeometry {
    /// The swept cross-section
    pub profile: ProfileDef,
    /// Extrusion depth
    pub depth: f64,
}

/// Cross-section profile of a swept solid
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ProfileDef {
    /// `IfcCircleProfileDef`
    Circle { radius: f64 },
    /// `IfcRectangleProfileDef`
    Rectangle { x_dim: f64, y_dim: f64 },
    /// Any other profile definition, by IFC type name
    Other { name: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_points_collects_extremes() {
        let bounds = BoundingBox::from_points([
            Point3::new(1.0, 5.0, -2.0),
            Point3::new(-3.0, 2.0, 4.0),
            Point3::new(0.0, 0.0, 0.0),
        ])
        .unwrap();
        assert_eq!(bounds.min, Point3::new(-3.0, 0.0, -2.0));
        assert_eq!(bounds.max, Point3::new(1.0, 5.0, 4.0));
        assert!(bounds.is_valid());
    }

    #[test]
    fn from_points_empty_is_none() {
        assert!(BoundingBox::from_points(std::iter::empty()).is_none());
    }

    #[test]
    fn overlap_requires_all_axes() {
        let a = BoundingBox::new([0.0, 0.0, 0.0], [1.0, 1.0, 1.0]);
        let b = BoundingBox::new([0.5, 0.5, 2.0], [1.5, 1.5, 3.0]);
        assert!(!a.overlaps(&b));

        let c = BoundingBox::new([0.5, 0.5, 0.5], [1.5, 1.5, 3.0]);
        assert!(a.overlaps(&c));
    }

    #[test]
    fn touching_boxes_overlap() {
        let a = BoundingBox::new([0.0, 0.0, 0.0], [1.0, 1.0, 1.0]);
        let b = BoundingBox::new([1.0, 0.0, 0.0], [2.0, 1.0, 1.0]);
        assert!(a.overlaps(&b));
        assert!(b.overlaps(&a));
    }

    #[test]
    fn overlap_is_symmetric() {
        let boxes = [
            BoundingBox::new([0.0, 0.0, 0.0], [1.0, 1.0, 1.0]),
            BoundingBox::new([0.9, -1.0, 0.2], [3.0, 0.1, 0.4]),
            BoundingBox::new([5.0, 5.0, 5.0], [6.0, 6.0, 6.0]),
            BoundingBox::new([-2.0, -2.0, -2.0], [10.0, 10.0, 10.0]),
            BoundingBox::new([0.2, 0.2, 1.0], [0.3, 0.3, 1.0]),
        ];
        for a in &boxes {
            for b in &boxes {
                assert_eq!(a.overlaps(b), b.overlaps(a));
            }
        }
    }

    #[test]
    fn padding_raises_only_top() {
        let a = BoundingBox::new([0.0, 0.0, 0.0], [4.0, 4.0, 2.7]);
        let padded = a.with_padded_max_z(0.5);
        assert_eq!(padded.min, a.min);
        assert_eq!(padded.max, Point3::new(4.0, 4.0, 3.2));
        assert_eq!(a.height(), 2.7);
    }

    #[test]
    fn profile_json_is_tagged() {
        let profile: ProfileGeometry = serde_json::from_str(
            r#"{ "profile": { "type": "Rectangle", "x_dim": 400.0, "y_dim": 200.0 }, "depth": 1500.0 }"#,
        )
        .unwrap();
        assert_eq!(
            profile.profile,
            ProfileDef::Rectangle {
                x_dim: 400.0,
                y_dim: 200.0
            }
        );
        assert_eq!(profile.depth, 1500.0);
    }
}
