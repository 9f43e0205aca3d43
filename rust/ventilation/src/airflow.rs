// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Space air-flow estimation.
//!
//! Required design air flow per space follows the EN 16798-1 approach:
//!
//! ```text
//! required = occupancy * per_person_rate(category) + area * per_area_rate(category)
//! ```
//!
//! Occupancy is the number of chairs found in the space. Without chairs it is
//! estimated from the floor area and a density for the space's usage label;
//! for unrecognised labels a backup density is used together with the lower
//! backup per-person rate.

use std::fmt;
use std::str::FromStr;

use ifc_lite_hvac_model::{ElementKind, GlobalId, ModelStore};
use serde::{Deserialize, Serialize};

use crate::clash::SpaceTerminalMap;
use crate::geometry::round2;
use crate::direction::FlowDirection;

/// Quantity set holding the space floor area
pub const SPACE_QUANTITY_SET: &str = "Qto_SpaceBaseQuantities";
/// Floor area quantity (m²)
pub const GROSS_FLOOR_AREA: &str = "GrossFloorArea";

/// Building ventilation category (EN 16798-1)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum VentilationCategory {
    I,
    #[default]
    II,
    III,
    IV,
}

/// Ventilation rates of one category, all in l/s
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CategoryRates {
    /// Per person, occupancy counted or from a known usage density
    pub per_person: f64,
    /// Per m² floor area
    pub per_area: f64,
    /// Per person, occupancy from the backup density
    pub backup_per_person: f64,
}

impl VentilationCategory {
    pub fn rates(&self) -> CategoryRates {
        let (per_person, per_area, backup_per_person) = match self {
            VentilationCategory::I => (10.0, 1.0, 2.0),
            VentilationCategory::II => (7.0, 0.7, 1.4),
            VentilationCategory::III => (4.0, 0.4, 0.8),
            VentilationCategory::IV => (2.5, 0.3, 0.55),
        };
        CategoryRates {
            per_person,
            per_area,
            backup_per_person,
        }
    }

    /// Parse a category code, substituting category II for invalid input.
    pub fn parse_or_default(code: &str) -> Self {
        code.parse().unwrap_or_else(|_| {
            tracing::warn!(code, "invalid ventilation category, using II");
            VentilationCategory::II
        })
    }
}

impl FromStr for VentilationCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "I" => Ok(VentilationCategory::I),
            "II" => Ok(VentilationCategory::II),
            "III" => Ok(VentilationCategory::III),
            "IV" => Ok(VentilationCategory::IV),
            _ => Err(format!("unknown ventilation category: {}", s)),
        }
    }
}

impl fmt::Display for VentilationCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let code = match self {
            VentilationCategory::I => "I",
            VentilationCategory::II => "II",
            VentilationCategory::III => "III",
            VentilationCategory::IV => "IV",
        };
        f.write_str(code)
    }
}

/// Assumed occupancy densities in m² per person, keyed by space usage label
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OccupancyDensities {
    pub by_label: Vec<(String, f64)>,
    /// Used for labels not in `by_label`
    pub backup: f64,
}

impl Default for OccupancyDensities {
    fn default() -> Self {
        let by_label = [
            ("Open Office", 17.0),
            ("Closed Office", 10.0),
            ("Classroom", 2.0),
            ("Meeting Room", 2.0),
            ("Auditorium", 5.0),
        ];
        Self {
            by_label: by_label
                .iter()
                .map(|(label, density)| (label.to_string(), *density))
                .collect(),
            backup: 10.0,
        }
    }
}

impl OccupancyDensities {
    /// Density for an exact usage label
    pub fn density_of(&self, label: &str) -> Option<f64> {
        self.by_label
            .iter()
            .find(|(known, _)| known == label)
            .map(|(_, density)| *density)
    }
}

/// Settings for the estimator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AirFlowSettings {
    pub category: VentilationCategory,
    pub densities: OccupancyDensities,
    /// Furniture whose name contains this counts as a seat
    pub seating_marker: String,
}

impl Default for AirFlowSettings {
    fn default() -> Self {
        Self {
            category: VentilationCategory::II,
            densities: OccupancyDensities::default(),
            seating_marker: "Chair".to_string(),
        }
    }
}

/// How the occupancy of a space was obtained
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum OccupancySource {
    /// Counted seating furniture
    Counted,
    /// Area divided by the density of a known usage label
    Density { label: String },
    /// Area divided by the backup density
    Backup,
}

/// Occupancy estimate of a space
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Occupancy {
    pub persons: f64,
    pub source: OccupancySource,
}

impl Occupancy {
    /// Estimate occupancy from a seat count, or from area and usage label.
    pub fn estimate(seats: usize, area: f64, label: &str, densities: &OccupancyDensities) -> Self {
        if seats > 0 {
            return Self {
                persons: seats as f64,
                source: OccupancySource::Counted,
            };
        }
        match densities.density_of(label) {
            Some(density) => Self {
                persons: area / density,
                source: OccupancySource::Density {
                    label: label.to_string(),
                },
            },
            None => Self {
                persons: area / densities.backup,
                source: OccupancySource::Backup,
            },
        }
    }
}

/// Required design air flow (l/s) of a space.
pub fn required_air_flow(category: VentilationCategory, occupancy: &Occupancy, area: f64) -> f64 {
    let rates = category.rates();
    let per_person = match occupancy.source {
        OccupancySource::Backup => rates.backup_per_person,
        OccupancySource::Counted | OccupancySource::Density { .. } => rates.per_person,
    };
    occupancy.persons * per_person + area * rates.per_area
}

/// Share of `required` per terminal; zero terminals give a zero share.
pub fn per_terminal_share(required: f64, terminals: usize) -> f64 {
    if terminals == 0 {
        return 0.0;
    }
    required / terminals as f64
}

/// Air-flow estimate of one space
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SpaceAirFlow {
    pub space: GlobalId,
    pub name: String,
    /// Floor area (m²)
    pub area: f64,
    pub occupancy: f64,
    pub occupancy_source: OccupancySource,
    /// Required design air flow (l/s)
    pub required_flow: f64,
    pub supply_count: usize,
    /// Supply flow per supply terminal (l/s)
    pub supply_share: f64,
    pub return_count: usize,
    /// Return flow per return terminal (l/s)
    pub return_share: f64,
}

impl SpaceAirFlow {
    pub fn share(&self, direction: FlowDirection) -> f64 {
        match direction {
            FlowDirection::Supply => self.supply_share,
            FlowDirection::Return => self.return_share,
        }
    }
}

/// Count seating furniture contained in a space.
pub fn count_seats(store: &dyn ModelStore, space: &GlobalId, marker: &str) -> usize {
    store
        .contained_elements(space)
        .iter()
        .filter_map(|id| store.element(id))
        .filter(|e| e.kind == ElementKind::Furniture)
        .filter(|e| e.name.as_deref().is_some_and(|name| name.contains(marker)))
        .count()
}

/// Floor area of a space; missing or negative areas count as zero.
pub fn floor_area(store: &dyn ModelStore, space: &GlobalId) -> f64 {
    match store.quantity_value(space, SPACE_QUANTITY_SET, GROSS_FLOOR_AREA) {
        Some(area) if area.is_finite() && area >= 0.0 => area,
        Some(area) => {
            tracing::warn!(space = %space, area, "invalid floor area, using 0");
            0.0
        }
        None => {
            tracing::warn!(space = %space, "space has no floor area, using 0");
            0.0
        }
    }
}

/// Estimate required air flow for every space with at least one terminal.
///
/// The required flow is rounded to two decimals before it is split between
/// the space's terminals.
pub fn estimate_space_flows(
    arch: &dyn ModelStore,
    map: &SpaceTerminalMap,
    settings: &AirFlowSettings,
) -> Vec<SpaceAirFlow> {
    map.spaces()
        .iter()
        .map(|entry| {
            let label = arch
                .element(&entry.space)
                .and_then(|e| e.long_name.as_deref())
                .unwrap_or("");
            let area = floor_area(arch, &entry.space);
            let seats = count_seats(arch, &entry.space, &settings.seating_marker);
            let occupancy = Occupancy::estimate(seats, area, label, &settings.densities);
            // Rounded once; terminal shares divide the value written back
            let required_flow = round2(required_air_flow(settings.category, &occupancy, area));

            let supply_count = entry.terminals.count(FlowDirection::Supply);
            let return_count = entry.terminals.count(FlowDirection::Return);

            tracing::debug!(
                space = %entry.space,
                area,
                occupancy = occupancy.persons,
                required_flow,
                "estimated space air flow"
            );

            SpaceAirFlow {
                space: entry.space.clone(),
                name: entry.name.clone(),
                area,
                occupancy: occupancy.persons,
                occupancy_source: occupancy.source,
                required_flow,
                supply_count,
                supply_share: per_terminal_share(required_flow, supply_count),
                return_count,
                return_share: per_terminal_share(required_flow, return_count),
            }
        })
        .collect()
}
