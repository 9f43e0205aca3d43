// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! In-memory model store backed by a JSON document.
//!
//! The document lists elements, distribution systems, flow-directed
//! port-to-port connections and spatial containment. Lookup indices are
//! rebuilt after loading; property sets written by an analysis are stored on
//! the elements themselves so that saving the snapshot persists them.
//!
//! ```json
//! {
//!   "length_unit_scale": 0.001,
//!   "elements": [ { "id": "...", "ifc_type": "IfcDuctSegment", ... } ],
//!   "systems": [ { "name": "360.VI.01", "elements": ["..."] } ],
//!   "connections": [ { "from": "...", "to": "..." } ],
//!   "containment": [ { "container": "...", "elements": ["..."] } ]
//! }
//! ```

use std::path::Path;

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::element::{Element, GlobalId, Port, PropertyValue};
use crate::error::{Error, Result};
use crate::geometry::{BoundingBox, ProfileGeometry};
use crate::kind::ElementKind;
use crate::store::{Containment, DistributionSystem, ModelStore, ModelWrite};

fn default_length_unit_scale() -> f64 {
    0.001
}

/// A distribution system as stored in the document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemRecord {
    pub name: String,
    #[serde(default)]
    pub elements: Vec<GlobalId>,
}

/// A directed port-to-port link: air leaves `from` and enters `to`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Connection {
    pub from: GlobalId,
    pub to: GlobalId,
}

/// Elements contained in one spatial structure element
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContainmentRecord {
    pub container: GlobalId,
    #[serde(default)]
    pub elements: Vec<GlobalId>,
}

/// In-memory model store
#[derive(Debug, Serialize, Deserialize)]
pub struct ModelSnapshot {
    #[serde(default = "default_length_unit_scale")]
    length_unit_scale: f64,
    #[serde(default)]
    elements: Vec<Element>,
    #[serde(default)]
    systems: Vec<SystemRecord>,
    #[serde(default)]
    connections: Vec<Connection>,
    #[serde(default)]
    containment: Vec<ContainmentRecord>,

    // Indices, rebuilt on load
    #[serde(skip)]
    element_index: FxHashMap<GlobalId, usize>,
    #[serde(skip)]
    downstream: FxHashMap<GlobalId, Vec<GlobalId>>,
    #[serde(skip)]
    upstream: FxHashMap<GlobalId, Vec<GlobalId>>,
    #[serde(skip)]
    element_systems: FxHashMap<GlobalId, Vec<usize>>,
    #[serde(skip)]
    container_of: FxHashMap<GlobalId, GlobalId>,
}

impl ModelSnapshot {
    /// Creates an empty snapshot with the given length unit (metres per unit).
    pub fn new(length_unit_scale: f64) -> Self {
        Self {
            length_unit_scale,
            elements: Vec::new(),
            systems: Vec::new(),
            connections: Vec::new(),
            containment: Vec::new(),
            element_index: FxHashMap::default(),
            downstream: FxHashMap::default(),
            upstream: FxHashMap::default(),
            element_systems: FxHashMap::default(),
            container_of: FxHashMap::default(),
        }
    }

    /// Deserializes a snapshot from a JSON string.
    pub fn from_json(json: &str) -> Result<Self> {
        let mut snapshot: ModelSnapshot = serde_json::from_str(json)?;
        snapshot.rebuild_indices()?;
        Ok(snapshot)
    }

    /// Reads and deserializes a snapshot file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    /// Serializes the snapshot, including written property sets.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Serializes the snapshot to a file.
    pub fn write_to_path(&self, path: impl AsRef<Path>) -> Result<()> {
        std::fs::write(path, self.to_json()?)?;
        Ok(())
    }

    /// Number of elements in the snapshot.
    pub fn element_count(&self) -> usize {
        self.elements.len()
    }

    // --- Construction ---

    /// Adds an element. Fails if its GlobalId is already taken.
    pub fn add_element(&mut self, mut element: Element) -> Result<()> {
        if self.element_index.contains_key(&element.id) {
            return Err(Error::DuplicateElement(element.id));
        }
        element.resolve_kind();
        self.element_index
            .insert(element.id.clone(), self.elements.len());
        self.elements.push(element);
        Ok(())
    }

    /// Adds a distribution system grouping existing elements.
    pub fn add_system(&mut self, name: &str, elements: &[GlobalId]) -> Result<()> {
        let context = format!("system {}", name);
        for id in elements {
            self.require(id, &context)?;
        }
        let index = self.systems.len();
        for id in elements {
            self.element_systems.entry(id.clone()).or_default().push(index);
        }
        self.systems.push(SystemRecord {
            name: name.to_string(),
            elements: elements.to_vec(),
        });
        Ok(())
    }

    /// Adds a flow-directed connection between two existing elements.
    pub fn connect(&mut self, from: &GlobalId, to: &GlobalId) -> Result<()> {
        self.require(from, "connection")?;
        self.require(to, "connection")?;
        self.link(from, to);
        self.connections.push(Connection {
            from: from.clone(),
            to: to.clone(),
        });
        Ok(())
    }

    /// Places existing elements in a spatial container.
    pub fn contain(&mut self, container: &GlobalId, elements: &[GlobalId]) -> Result<()> {
        for id in elements {
            self.reassign_container(id, container)?;
        }
        Ok(())
    }

    fn require(&self, id: &GlobalId, context: &str) -> Result<()> {
        if self.element_index.contains_key(id) {
            Ok(())
        } else {
            Err(Error::UnknownReference {
                context: context.to_string(),
                id: id.clone(),
            })
        }
    }

    fn link(&mut self, from: &GlobalId, to: &GlobalId) {
        self.downstream
            .entry(from.clone())
            .or_default()
            .push(to.clone());
        self.upstream.entry(to.clone()).or_default().push(from.clone());
    }

    /// Rebuilds every lookup index from the document fields and validates
    /// all references.
    fn rebuild_indices(&mut self) -> Result<()> {
        self.element_index.clear();
        self.downstream.clear();
        self.upstream.clear();
        self.element_systems.clear();
        self.container_of.clear();

        for (i, element) in self.elements.iter_mut().enumerate() {
            element.resolve_kind();
            if self.element_index.insert(element.id.clone(), i).is_some() {
                return Err(Error::DuplicateElement(element.id.clone()));
            }
        }

        for (index, system) in self.systems.iter().enumerate() {
            for id in &system.elements {
                if !self.element_index.contains_key(id) {
                    return Err(Error::UnknownReference {
                        context: format!("system {}", system.name),
                        id: id.clone(),
                    });
                }
                self.element_systems.entry(id.clone()).or_default().push(index);
            }
        }

        let connections = std::mem::take(&mut self.connections);
        for connection in &connections {
            self.require(&connection.from, "connection")?;
            self.require(&connection.to, "connection")?;
            self.link(&connection.from, &connection.to);
        }
        self.connections = connections;

        for record in &self.containment {
            let context = format!("containment in {}", record.container);
            if !self.element_index.contains_key(&record.container) {
                return Err(Error::UnknownReference {
                    context,
                    id: record.container.clone(),
                });
            }
            for id in &record.elements {
                if !self.element_index.contains_key(id) {
                    return Err(Error::UnknownReference {
                        context,
                        id: id.clone(),
                    });
                }
                self.container_of.insert(id.clone(), record.container.clone());
            }
        }

        Ok(())
    }

    fn element_mut(&mut self, id: &GlobalId) -> Option<&mut Element> {
        let index = *self.element_index.get(id)?;
        self.elements.get_mut(index)
    }
}

impl ModelStore for ModelSnapshot {
    fn elements_by_type(&self, kind: &ElementKind) -> Vec<GlobalId> {
        self.elements
            .iter()
            .filter(|e| &e.kind == kind)
            .map(|e| e.id.clone())
            .collect()
    }

    fn element(&self, id: &GlobalId) -> Option<&Element> {
        self.element_index.get(id).map(|&i| &self.elements[i])
    }

    fn distribution_systems(&self) -> Vec<DistributionSystem> {
        self.systems
            .iter()
            .map(|s| DistributionSystem {
                name: s.name.clone(),
                element_ids: s.elements.clone(),
            })
            .collect()
    }

    fn ports_of(&self, id: &GlobalId) -> &[Port] {
        self.element(id).map(|e| e.ports.as_slice()).unwrap_or(&[])
    }

    fn connected_from(&self, id: &GlobalId) -> Vec<GlobalId> {
        self.downstream.get(id).cloned().unwrap_or_default()
    }

    fn connected_to(&self, id: &GlobalId) -> Vec<GlobalId> {
        self.upstream.get(id).cloned().unwrap_or_default()
    }

    fn systems_of(&self, id: &GlobalId) -> Vec<String> {
        self.element_systems
            .get(id)
            .map(|indices| {
                indices
                    .iter()
                    .map(|&i| self.systems[i].name.clone())
                    .collect()
            })
            .unwrap_or_default()
    }

    fn world_bounding_box(&self, id: &GlobalId) -> Option<BoundingBox> {
        self.element(id)?.bounding_box.filter(|b| b.is_valid())
    }

    fn profile_geometry(&self, id: &GlobalId) -> Option<ProfileGeometry> {
        self.element(id)?.profile.clone()
    }

    fn length_unit_scale(&self) -> f64 {
        self.length_unit_scale
    }

    fn containing_storey(&self, id: &GlobalId) -> Containment {
        let container = match self.container_of.get(id).and_then(|c| self.element(c)) {
            Some(container) => container,
            None => return Containment::None,
        };
        let name = container.display_name().to_string();
        match container.kind {
            ElementKind::BuildingStorey => Containment::Storey {
                elevation: container.elevation.unwrap_or(0.0),
                name,
            },
            ElementKind::Building => Containment::Building { name },
            _ => Containment::None,
        }
    }

    fn contained_elements(&self, container: &GlobalId) -> Vec<GlobalId> {
        self.containment
            .iter()
            .filter(|r| &r.container == container)
            .flat_map(|r| r.elements.iter().cloned())
            .collect()
    }

    fn quantity_value(&self, id: &GlobalId, qset: &str, name: &str) -> Option<f64> {
        self.element(id)?.quantities.get(qset)?.get(name)?.as_f64()
    }

    fn property_value(&self, id: &GlobalId, pset: &str, name: &str) -> Option<&PropertyValue> {
        self.element(id)?.properties.get(pset)?.get(name)
    }
}

impl ModelWrite for ModelSnapshot {
    fn write_property(
        &mut self,
        id: &GlobalId,
        pset: &str,
        name: &str,
        value: PropertyValue,
    ) -> Result<()> {
        let element = self
            .element_mut(id)
            .ok_or_else(|| Error::ElementNotFound(id.clone()))?;
        element
            .properties
            .entry(pset.to_string())
            .or_default()
            .insert(name.to_string(), value);
        Ok(())
    }

    fn reassign_container(&mut self, id: &GlobalId, container: &GlobalId) -> Result<()> {
        if !self.element_index.contains_key(id) {
            return Err(Error::ElementNotFound(id.clone()));
        }
        if !self.element_index.contains_key(container) {
            return Err(Error::ElementNotFound(container.clone()));
        }

        for record in &mut self.containment {
            record.elements.retain(|e| e != id);
        }
        self.containment.retain(|r| !r.elements.is_empty());

        match self.containment.iter_mut().find(|r| &r.container == container) {
            Some(record) => record.elements.push(id.clone()),
            None => self.containment.push(ContainmentRecord {
                container: container.clone(),
                elements: vec![id.clone()],
            }),
        }
        self.container_of.insert(id.clone(), container.clone());
        Ok(())
    }
}
