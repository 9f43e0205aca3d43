// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Element kinds
//!
//! The IFC type name of an element is resolved once, when the model is
//! loaded, into a closed set of kinds the analysis dispatches on. Anything
//! the analysis has no special handling for lands in [`ElementKind::Other`]
//! with its original type name preserved.

use std::fmt;

/// Element kinds relevant to ventilation analysis
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ElementKind {
    // Distribution elements
    DuctSegment,
    DuctFitting,
    AirTerminal,
    /// Central air-handling equipment (`IfcUnitaryEquipment`)
    AirHandlingUnit,
    DistributionPort,

    // Spatial structure
    Space,
    BuildingStorey,
    Building,

    // Occupancy hints
    Furniture,

    /// Fallback, keeps the IFC type name as written in the model
    Other(String),
}

impl ElementKind {
    /// Resolve an IFC type name.
    ///
    /// Accepts both the schema spelling (`IfcDuctSegment`) and the upper-case
    /// STEP spelling (`IFCDUCTSEGMENT`).
    pub fn from_ifc_name(name: &str) -> Self {
        match name.trim().to_ascii_uppercase().as_str() {
            "IFCDUCTSEGMENT" => Self::DuctSegment,
            "IFCDUCTFITTING" => Self::DuctFitting,
            "IFCAIRTERMINAL" => Self::AirTerminal,
            "IFCUNITARYEQUIPMENT" => Self::AirHandlingUnit,
            "IFCDISTRIBUTIONPORT" => Self::DistributionPort,
            "IFCSPACE" => Self::Space,
            "IFCBUILDINGSTOREY" => Self::BuildingStorey,
            "IFCBUILDING" => Self::Building,
            "IFCFURNITURE" | "IFCFURNISHINGELEMENT" => Self::Furniture,
            _ => Self::Other(name.trim().to_string()),
        }
    }

    /// IFC schema name of this kind
    pub fn ifc_name(&self) -> &str {
        match self {
            Self::DuctSegment => "IfcDuctSegment",
            Self::DuctFitting => "IfcDuctFitting",
            Self::AirTerminal => "IfcAirTerminal",
            Self::AirHandlingUnit => "IfcUnitaryEquipment",
            Self::DistributionPort => "IfcDistributionPort",
            Self::Space => "IfcSpace",
            Self::BuildingStorey => "IfcBuildingStorey",
            Self::Building => "IfcBuilding",
            Self::Furniture => "IfcFurniture",
            Self::Other(name) => name,
        }
    }

    /// Check if this is a pure connection point rather than a physical element
    pub fn is_port(&self) -> bool {
        matches!(self, Self::DistributionPort)
    }

    /// Check if this is a spatial structure element
    pub fn is_spatial(&self) -> bool {
        matches!(self, Self::Space | Self::BuildingStorey | Self::Building)
    }
}

impl Default for ElementKind {
    fn default() -> Self {
        Self::Other(String::new())
    }
}

impl fmt::Display for ElementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.ifc_name())
    }
}
