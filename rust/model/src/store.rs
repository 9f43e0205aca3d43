// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Store traits consumed by the ventilation analysis.
//!
//! The read side ([`ModelStore`]) and the write side ([`ModelWrite`]) are
//! separate so that analysis passes can run against a shared borrow and all
//! mutation happens in one bounded commit step afterwards.

use crate::element::{Element, GlobalId, Port, PropertyValue};
use crate::error::Result;
use crate::geometry::{BoundingBox, ProfileGeometry};
use crate::kind::ElementKind;

/// A named group of elements forming one air-flow network
#[derive(Debug, Clone, PartialEq)]
pub struct DistributionSystem {
    pub name: String,
    /// Grouped elements in model order (ports included)
    pub element_ids: Vec<GlobalId>,
}

/// Spatial container of an element
#[derive(Debug, Clone, PartialEq)]
pub enum Containment {
    /// Contained in a building storey; elevation in model length units
    Storey { elevation: f64, name: String },
    /// Assigned directly to the building
    Building { name: String },
    /// Not contained in any spatial structure
    None,
}

/// Read access to a building model
pub trait ModelStore {
    /// All elements of the given kind, in model order
    fn elements_by_type(&self, kind: &ElementKind) -> Vec<GlobalId>;

    /// Element record by GlobalId
    fn element(&self, id: &GlobalId) -> Option<&Element>;

    /// All distribution systems, in model order
    fn distribution_systems(&self) -> Vec<DistributionSystem>;

    /// Connection points of an element
    fn ports_of(&self, id: &GlobalId) -> &[Port];

    /// Elements that air leaves `id` towards
    fn connected_from(&self, id: &GlobalId) -> Vec<GlobalId>;

    /// Elements that air enters `id` from
    fn connected_to(&self, id: &GlobalId) -> Vec<GlobalId>;

    /// Names of the distribution systems grouping an element
    fn systems_of(&self, id: &GlobalId) -> Vec<String>;

    /// Axis-aligned world bounding box of an element's body geometry
    fn world_bounding_box(&self, id: &GlobalId) -> Option<BoundingBox>;

    /// Swept-solid profile of an element's body geometry
    fn profile_geometry(&self, id: &GlobalId) -> Option<ProfileGeometry>;

    /// Metres per model length unit
    fn length_unit_scale(&self) -> f64;

    /// Spatial container of an element
    fn containing_storey(&self, id: &GlobalId) -> Containment;

    /// Elements contained in a spatial element (e.g. furniture in a space)
    fn contained_elements(&self, container: &GlobalId) -> Vec<GlobalId>;

    /// Numeric quantity from a quantity set
    fn quantity_value(&self, id: &GlobalId, qset: &str, name: &str) -> Option<f64>;

    /// Property from a property set
    fn property_value(&self, id: &GlobalId, pset: &str, name: &str) -> Option<&PropertyValue>;
}

/// Write access to a building model
pub trait ModelWrite {
    /// Insert or overwrite a single property.
    ///
    /// Writing the same property twice leaves one property holding the
    /// latest value.
    fn write_property(
        &mut self,
        id: &GlobalId,
        pset: &str,
        name: &str,
        value: PropertyValue,
    ) -> Result<()>;

    /// Move an element into a different spatial container
    fn reassign_container(&mut self, id: &GlobalId, container: &GlobalId) -> Result<()>;
}
