// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Element records held by a model store.

use std::collections::BTreeMap;
use std::fmt;

use nalgebra::Point3;
use serde::{Deserialize, Serialize};

use crate::geometry::{BoundingBox, ProfileGeometry};
use crate::kind::ElementKind;

/// IFC GlobalId of an element
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GlobalId(pub String);

impl GlobalId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for GlobalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for GlobalId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for GlobalId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// A connection point of a distribution element
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Port {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Placement origin of the port in world coordinates
    pub position: Point3<f64>,
}

/// A single property value written to or read from a property set
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PropertyValue {
    Boolean(bool),
    Integer(i64),
    Real(f64),
    Text(String),
}

impl PropertyValue {
    /// Numeric view of the value, if it has one
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            PropertyValue::Real(v) => Some(*v),
            PropertyValue::Integer(v) => Some(*v as f64),
            _ => None,
        }
    }
}

/// Named values grouped by set name (property sets or quantity sets)
pub type ValueSets = BTreeMap<String, BTreeMap<String, PropertyValue>>;

/// One element of the building model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Element {
    pub id: GlobalId,
    /// IFC entity name as found in the source model
    pub ifc_type: String,
    /// Kind resolved from `ifc_type` when the element is ingested
    #[serde(skip)]
    pub kind: ElementKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Free-text type label (`ObjectType`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub object_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub long_name: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ports: Vec<Port>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bounding_box: Option<BoundingBox>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile: Option<ProfileGeometry>,
    /// Storey elevation in model length units (storeys only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub elevation: Option<f64>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub quantities: ValueSets,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub properties: ValueSets,
}

impl Element {
    /// Create a bare element of the given IFC type
    pub fn new(id: impl Into<GlobalId>, ifc_type: &str) -> Self {
        Self {
            id: id.into(),
            ifc_type: ifc_type.to_string(),
            kind: ElementKind::from_ifc_name(ifc_type),
            name: None,
            object_type: None,
            long_name: None,
            ports: Vec::new(),
            bounding_box: None,
            profile: None,
            elevation: None,
            quantities: ValueSets::new(),
            properties: ValueSets::new(),
        }
    }

    /// Re-resolve `kind` from `ifc_type` after deserialization
    pub(crate) fn resolve_kind(&mut self) {
        self.kind = ElementKind::from_ifc_name(&self.ifc_type);
    }

    /// Name for display: long name, then name, then GlobalId
    pub fn display_name(&self) -> &str {
        self.long_name
            .as_deref()
            .or(self.name.as_deref())
            .unwrap_or(self.id.as_str())
    }
}
