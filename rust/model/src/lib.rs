// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! # IFC-Lite HVAC Model
//!
//! The building-model store consumed by the ventilation analysis.
//!
//! Analysis code never touches an IFC file directly. It talks to a
//! [`ModelStore`] (reads: elements by type, distribution systems, ports,
//! flow-directed connectivity, world bounding boxes, swept profiles,
//! quantities) and a [`ModelWrite`] (idempotent property upserts and
//! container reassignment).
//!
//! [`ModelSnapshot`] is the in-memory implementation of both traits. It is
//! loaded from a JSON document exported from a BIM tool and can be written
//! back out after the analysis has attached its results.
//!
//! ```
//! use ifc_lite_hvac_model::{ElementKind, ModelSnapshot, ModelStore};
//!
//! let snapshot = ModelSnapshot::from_json(r#"{
//!     "elements": [
//!         { "id": "3vB2YO$MX4xv5uCqZZG05x", "ifc_type": "IfcAirTerminal" }
//!     ]
//! }"#).unwrap();
//!
//! assert_eq!(snapshot.elements_by_type(&ElementKind::AirTerminal).len(), 1);
//! ```

pub mod element;
pub mod error;
pub mod geometry;
pub mod kind;
pub mod snapshot;
pub mod store;

pub use element::{Element, GlobalId, Port, PropertyValue};
pub use error::{Error, Result};
pub use geometry::{BoundingBox, ProfileDef, ProfileGeometry};
pub use kind::ElementKind;
pub use nalgebra::{Point3, Vector3};
pub use snapshot::{Connection, ContainmentRecord, ModelSnapshot, SystemRecord};
pub use store::{Containment, DistributionSystem, ModelStore, ModelWrite};
