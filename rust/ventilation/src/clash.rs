// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Space-terminal clash resolution.
//!
//! Assigns every air terminal of an identified system to the architectural
//! space whose bounding box it overlaps. Space boxes get a vertical pad on
//! their top face so that terminals seated just above the modelled ceiling
//! still match.
//!
//! The first overlapping space in model order wins. A terminal near a shared
//! wall can overlap two padded boxes and the result then depends on the order
//! of the spaces in the model.

use ifc_lite_hvac_model::{BoundingBox, ElementKind, GlobalId, ModelStore};
use rustc_hash::{FxHashMap, FxHashSet};
use serde::{Deserialize, Serialize};

use crate::classifier::Classification;
use crate::direction::FlowDirection;
use crate::geometry::GeometryAdapter;

/// Settings for the clash resolver
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClashSettings {
    /// Added to the top of every space box (m)
    pub vertical_tolerance: f64,
    /// Spaces whose long name contains any of these are not occupiable
    pub excluded_space_labels: Vec<String>,
}

impl Default for ClashSettings {
    fn default() -> Self {
        Self {
            vertical_tolerance: 0.5,
            excluded_space_labels: vec!["Area".to_string(), "Rooftop Terrace".to_string()],
        }
    }
}

impl ClashSettings {
    fn is_excluded(&self, long_name: &str) -> bool {
        self.excluded_space_labels
            .iter()
            .any(|label| !label.is_empty() && long_name.contains(label.as_str()))
    }
}

/// Supply and return terminal ids
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TerminalSet {
    pub supply: Vec<GlobalId>,
    #[serde(rename = "return")]
    pub return_: Vec<GlobalId>,
}

impl TerminalSet {
    pub fn get(&self, direction: FlowDirection) -> &[GlobalId] {
        match direction {
            FlowDirection::Supply => &self.supply,
            FlowDirection::Return => &self.return_,
        }
    }

    fn push(&mut self, direction: FlowDirection, id: GlobalId) {
        match direction {
            FlowDirection::Supply => self.supply.push(id),
            FlowDirection::Return => self.return_.push(id),
        }
    }

    pub fn count(&self, direction: FlowDirection) -> usize {
        self.get(direction).len()
    }

    pub fn len(&self) -> usize {
        self.supply.len() + self.return_.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Terminals assigned to one space
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SpaceTerminals {
    pub space: GlobalId,
    pub name: String,
    pub terminals: TerminalSet,
}

/// Space to terminal assignment, plus the unassigned bucket
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SpaceTerminalMap {
    /// Spaces in order of their first assigned terminal
    spaces: Vec<SpaceTerminals>,
    #[serde(skip)]
    index: FxHashMap<GlobalId, usize>,
    unassigned: TerminalSet,
}

impl SpaceTerminalMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Assign a terminal to a space
    pub fn assign(
        &mut self,
        space: &GlobalId,
        name: &str,
        direction: FlowDirection,
        terminal: GlobalId,
    ) {
        let index = match self.index.get(space) {
            Some(&index) => index,
            None => {
                self.spaces.push(SpaceTerminals {
                    space: space.clone(),
                    name: name.to_string(),
                    terminals: TerminalSet::default(),
                });
                self.index.insert(space.clone(), self.spaces.len() - 1);
                self.spaces.len() - 1
            }
        };
        self.spaces[index].terminals.push(direction, terminal);
    }

    /// Record a terminal without a space
    pub fn mark_unassigned(&mut self, direction: FlowDirection, terminal: GlobalId) {
        self.unassigned.push(direction, terminal);
    }

    pub fn spaces(&self) -> &[SpaceTerminals] {
        &self.spaces
    }

    pub fn space(&self, id: &GlobalId) -> Option<&SpaceTerminals> {
        self.index.get(id).map(|&i| &self.spaces[i])
    }

    pub fn unassigned(&self) -> &TerminalSet {
        &self.unassigned
    }

    /// Total number of terminals, assigned or not
    pub fn terminal_count(&self) -> usize {
        self.spaces.iter().map(|s| s.terminals.len()).sum::<usize>() + self.unassigned.len()
    }
}

struct SpaceCandidate {
    id: GlobalId,
    name: String,
    bounds: BoundingBox,
}

/// Collect the occupiable spaces of the architectural model with padded boxes.
fn space_candidates(
    geometry: &mut GeometryAdapter<'_>,
    settings: &ClashSettings,
) -> Vec<SpaceCandidate> {
    let store = geometry.store();
    let mut candidates = Vec::new();
    for id in store.elements_by_type(&ElementKind::Space) {
        let Some(space) = store.element(&id) else {
            continue;
        };
        let long_name = space.long_name.as_deref().unwrap_or("");
        if settings.is_excluded(long_name) {
            tracing::debug!(space = %id, name = long_name, "space excluded from clash check");
            continue;
        }
        let Some(bounds) = geometry.bounding_box(&id) else {
            tracing::warn!(space = %id, "skipping space without geometry");
            continue;
        };
        candidates.push(SpaceCandidate {
            name: space.display_name().to_string(),
            id,
            bounds: bounds.with_padded_max_z(settings.vertical_tolerance),
        });
    }
    candidates
}

/// Assign the air terminals of every identified system to spaces.
///
/// `mep` resolves terminal geometry, `arch` resolves space geometry; both may
/// wrap the same store. Every terminal ends up either in exactly one space or
/// in the unassigned bucket. A terminal grouped by two systems is resolved
/// once, under the first system in name order.
pub fn resolve_terminals(
    mep: &mut GeometryAdapter<'_>,
    arch: &mut GeometryAdapter<'_>,
    classification: &Classification,
    settings: &ClashSettings,
) -> SpaceTerminalMap {
    let spaces = space_candidates(arch, settings);
    let store = mep.store();
    let mut map = SpaceTerminalMap::new();
    let mut seen: FxHashSet<GlobalId> = FxHashSet::default();

    for info in classification.identified.values() {
        let terminals = info.element_ids.iter().filter(|id| {
            store
                .element(id)
                .map(|e| e.kind == ElementKind::AirTerminal)
                .unwrap_or(false)
        });

        for terminal in terminals {
            if !seen.insert(terminal.clone()) {
                continue;
            }
            let Some(bounds) = mep.bounding_box(terminal) else {
                tracing::warn!(
                    terminal = %terminal,
                    system = %info.name,
                    "air terminal has no geometry"
                );
                map.mark_unassigned(info.direction, terminal.clone());
                continue;
            };

            match spaces.iter().find(|space| bounds.overlaps(&space.bounds)) {
                Some(space) => map.assign(&space.id, &space.name, info.direction, terminal.clone()),
                None => map.mark_unassigned(info.direction, terminal.clone()),
            }
        }
    }

    tracing::info!(
        spaces = map.spaces().len(),
        unassigned_supply = map.unassigned().supply.len(),
        unassigned_return = map.unassigned().return_.len(),
        "resolved air terminals to spaces"
    );

    map
}
