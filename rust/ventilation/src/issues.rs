// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Coordination issues for issue-ticket export.

use ifc_lite_hvac_model::GlobalId;
use serde::Serialize;

use crate::classifier::Classification;
use crate::clash::SpaceTerminalMap;
use crate::direction::FlowDirection;

/// Kind of coordination defect
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum IssueKind {
    MissingAirHandlingUnit,
    UnassignedTerminal,
}

/// One defect with the elements it concerns
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Issue {
    pub kind: IssueKind,
    /// Grouping title, e.g. `Missing AHU - 360.VU.02`
    pub category: String,
    pub elements: Vec<GlobalId>,
    pub message: String,
}

/// Collect issues for systems without a unit and for unassigned terminals.
///
/// Systems without elements produce no issue.
pub fn collect_issues(classification: &Classification, map: &SpaceTerminalMap) -> Vec<Issue> {
    let mut issues = Vec::new();

    for (name, info) in &classification.missing {
        if info.element_ids.is_empty() {
            continue;
        }
        let types: Vec<&str> = info.element_types.iter().map(String::as_str).collect();
        issues.push(Issue {
            kind: IssueKind::MissingAirHandlingUnit,
            category: format!("Missing AHU - {}", name),
            elements: info.element_ids.clone(),
            message: format!(
                "Distribution system '{}' contains {} elements but no air-handling unit was found.\nElement types: {}",
                name,
                info.element_count(),
                types.join(", ")
            ),
        });
    }

    for direction in FlowDirection::ALL {
        for terminal in map.unassigned().get(direction) {
            issues.push(Issue {
                kind: IssueKind::UnassignedTerminal,
                category: format!("Unassigned Terminals - {}", direction),
                elements: vec![terminal.clone()],
                message: format!(
                    "Air terminal {} ({}) is not located inside a space.",
                    terminal, direction
                ),
            });
        }
    }

    issues
}
