// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Flow direction of a distribution system.
//!
//! Models carry no structured supply/return attribute on their systems, so
//! the direction is inferred from a marker substring in the system name
//! (`"360.VI.01"` supplies, `"360.VU.01"` returns). [`NamingConvention`] is
//! the only place that inference happens.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Direction of air flow relative to the air-handling unit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum FlowDirection {
    /// Air leaves the unit towards the rooms
    Supply,
    /// Air leaves the rooms towards the unit
    Return,
}

impl FlowDirection {
    pub const ALL: [FlowDirection; 2] = [FlowDirection::Supply, FlowDirection::Return];

    pub fn as_str(&self) -> &'static str {
        match self {
            FlowDirection::Supply => "Supply",
            FlowDirection::Return => "Return",
        }
    }
}

impl fmt::Display for FlowDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Name markers identifying supply and return systems
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamingConvention {
    pub supply_marker: String,
    pub return_marker: String,
}

impl Default for NamingConvention {
    fn default() -> Self {
        Self {
            supply_marker: "VI".to_string(),
            return_marker: "VU".to_string(),
        }
    }
}

impl NamingConvention {
    pub fn new(supply_marker: impl Into<String>, return_marker: impl Into<String>) -> Self {
        Self {
            supply_marker: supply_marker.into(),
            return_marker: return_marker.into(),
        }
    }

    /// Infer the flow direction of a system from its name.
    ///
    /// The supply marker is checked first, so a name carrying both markers is
    /// a supply system. Empty markers never match.
    pub fn direction_of(&self, system_name: &str) -> Option<FlowDirection> {
        if !self.supply_marker.is_empty() && system_name.contains(&self.supply_marker) {
            Some(FlowDirection::Supply)
        } else if !self.return_marker.is_empty() && system_name.contains(&self.return_marker) {
            Some(FlowDirection::Return)
        } else {
            None
        }
    }
}
