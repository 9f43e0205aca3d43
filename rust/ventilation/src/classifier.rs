// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! AHU/system classification.
//!
//! Every distribution system whose name carries a supply or return marker is
//! sorted into one of two buckets: *identified* systems contain at least one
//! air-handling unit and take part in the rest of the analysis, *missing*
//! systems do not and are only reported. Identified systems that share a unit
//! are paired (a supply system and its return twin).

use std::collections::{BTreeMap, BTreeSet};

use ifc_lite_hvac_model::{Element, ElementKind, GlobalId, ModelStore};
use serde::Serialize;

use crate::direction::{FlowDirection, NamingConvention};

/// Equipment-type labels that mark an air-handling unit in models where the
/// unit is not typed as `IfcUnitaryEquipment`.
pub const VENDOR_AHU_MARKERS: &[&str] = &["Geniox"];

/// Check whether an element is an air-handling unit.
///
/// Falls back to the vendor label list for models with incomplete typing.
pub fn is_air_handling_unit(element: &Element) -> bool {
    if element.kind == ElementKind::AirHandlingUnit {
        return true;
    }
    element
        .object_type
        .as_deref()
        .map(|label| VENDOR_AHU_MARKERS.iter().any(|marker| label.contains(marker)))
        .unwrap_or(false)
}

/// One distribution system after classification
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SystemInfo {
    pub name: String,
    pub direction: FlowDirection,
    /// Grouped elements without ports
    pub element_ids: Vec<GlobalId>,
    /// IFC type names present in the system, sorted
    pub element_types: BTreeSet<String>,
    /// Air-handling units in model order
    pub air_handling_units: Vec<GlobalId>,
    /// Identified systems sharing a unit with this one
    pub paired_systems: Vec<String>,
}

impl SystemInfo {
    pub fn element_count(&self) -> usize {
        self.element_ids.len()
    }

    pub fn is_identified(&self) -> bool {
        !self.air_handling_units.is_empty()
    }

    /// First air-handling unit, where the traversal starts
    pub fn primary_unit(&self) -> Option<&GlobalId> {
        self.air_handling_units.first()
    }
}

/// An air-handling unit and the systems it serves
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AhuPairing {
    pub unit: GlobalId,
    pub supply_system: Option<String>,
    pub supply_count: usize,
    pub return_system: Option<String>,
    pub return_count: usize,
}

/// Result of classifying all ventilation systems of a model
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Classification {
    /// Systems with an air-handling unit, by name
    pub identified: BTreeMap<String, SystemInfo>,
    /// Systems without an air-handling unit, by name
    pub missing: BTreeMap<String, SystemInfo>,
    /// One row per distinct air-handling unit
    pub pairings: Vec<AhuPairing>,
}

impl Classification {
    /// Total number of elements in systems without an air-handling unit
    pub fn unanalysed_element_count(&self) -> usize {
        self.missing.values().map(SystemInfo::element_count).sum()
    }

    /// Identified or missing system by name
    pub fn system(&self, name: &str) -> Option<&SystemInfo> {
        self.identified.get(name).or_else(|| self.missing.get(name))
    }
}

/// Classify every ventilation system of a model.
///
/// Systems whose name carries neither marker are not ventilation systems and
/// are ignored. Running this twice on the same store gives the same result.
pub fn classify_systems(store: &dyn ModelStore, convention: &NamingConvention) -> Classification {
    let mut classification = Classification::default();

    for system in store.distribution_systems() {
        let Some(direction) = convention.direction_of(&system.name) else {
            tracing::debug!(system = %system.name, "not a ventilation system, skipped");
            continue;
        };

        let mut info = SystemInfo {
            name: system.name.clone(),
            direction,
            element_ids: Vec::with_capacity(system.element_ids.len()),
            element_types: BTreeSet::new(),
            air_handling_units: Vec::new(),
            paired_systems: Vec::new(),
        };

        for id in &system.element_ids {
            let Some(element) = store.element(id) else {
                tracing::warn!(
                    system = %system.name,
                    element = %id,
                    "system references unknown element"
                );
                continue;
            };
            if element.kind.is_port() {
                continue;
            }
            info.element_types.insert(element.kind.ifc_name().to_string());
            if is_air_handling_unit(element) && !info.air_handling_units.contains(id) {
                info.air_handling_units.push(id.clone());
            }
            info.element_ids.push(id.clone());
        }

        let bucket = if info.is_identified() {
            &mut classification.identified
        } else {
            &mut classification.missing
        };
        // Duplicate system names merge into the first occurrence
        match bucket.get_mut(&info.name) {
            Some(existing) => {
                tracing::warn!(system = %info.name, "duplicate system name");
                existing.element_ids.extend(info.element_ids);
                existing.element_types.extend(info.element_types);
                for unit in info.air_handling_units {
                    if !existing.air_handling_units.contains(&unit) {
                        existing.air_handling_units.push(unit);
                    }
                }
            }
            None => {
                bucket.insert(info.name.clone(), info);
            }
        }
    }

    pair_systems(&mut classification);

    tracing::info!(
        identified = classification.identified.len(),
        missing = classification.missing.len(),
        unanalysed_elements = classification.unanalysed_element_count(),
        "classified ventilation systems"
    );

    classification
}

/// Fill in `paired_systems` and build one pairing row per unit.
fn pair_systems(classification: &mut Classification) {
    // unit -> systems in name order
    let mut by_unit: BTreeMap<GlobalId, Vec<String>> = BTreeMap::new();
    let mut unit_order: Vec<GlobalId> = Vec::new();
    for info in classification.identified.values() {
        for unit in &info.air_handling_units {
            let systems = by_unit.entry(unit.clone()).or_default();
            if systems.is_empty() {
                unit_order.push(unit.clone());
            }
            systems.push(info.name.clone());
        }
    }

    let names: Vec<String> = classification.identified.keys().cloned().collect();
    for name in &names {
        let mut paired: Vec<String> = Vec::new();
        if let Some(info) = classification.identified.get(name) {
            for unit in &info.air_handling_units {
                for other in by_unit.get(unit).into_iter().flatten() {
                    if other != name && !paired.contains(other) {
                        paired.push(other.clone());
                    }
                }
            }
        }
        if let Some(info) = classification.identified.get_mut(name) {
            info.paired_systems = paired;
        }
    }

    classification.pairings = unit_order
        .into_iter()
        .map(|unit| {
            let systems = by_unit.get(&unit).map(Vec::as_slice).unwrap_or(&[]);
            let pick = |direction: FlowDirection| {
                systems
                    .iter()
                    .filter_map(|name| classification.identified.get(name))
                    .find(|info| info.direction == direction)
                    .map(|info| (info.name.clone(), info.element_count()))
            };
            let supply = pick(FlowDirection::Supply);
            let ret = pick(FlowDirection::Return);
            AhuPairing {
                unit,
                supply_count: supply.as_ref().map_or(0, |(_, count)| *count),
                supply_system: supply.map(|(name, _)| name),
                return_count: ret.as_ref().map_or(0, |(_, count)| *count),
                return_system: ret.map(|(name, _)| name),
            }
        })
        .collect();
}
