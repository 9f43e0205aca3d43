// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Reporting surface: table rows, plain-text tables and tree exports.

use std::collections::BTreeMap;
use std::fmt;

use ifc_lite_hvac_model::GlobalId;
use serde::Serialize;

use crate::airflow::SpaceAirFlow;
use crate::classifier::{AhuPairing, Classification, SystemInfo};
use crate::clash::SpaceTerminalMap;
use crate::tree::{ConnectivityTree, NodeKey};

/// Row of the AHU/system classification table
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SystemRow {
    pub system_name: String,
    pub element_count: usize,
    pub element_types: Vec<String>,
    pub is_identified: bool,
}

impl From<&SystemInfo> for SystemRow {
    fn from(info: &SystemInfo) -> Self {
        Self {
            system_name: info.name.clone(),
            element_count: info.element_count(),
            element_types: info.element_types.iter().cloned().collect(),
            is_identified: info.is_identified(),
        }
    }
}

/// Classification rows, identified and missing systems in name order
pub fn system_rows(classification: &Classification) -> Vec<SystemRow> {
    let mut rows: Vec<SystemRow> = classification
        .identified
        .values()
        .chain(classification.missing.values())
        .map(SystemRow::from)
        .collect();
    rows.sort_by(|a, b| a.system_name.cmp(&b.system_name));
    rows
}

/// Exported tree node
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NodeExport {
    pub identifier: String,
    pub element_id: Option<GlobalId>,
    pub ifc_type: String,
    pub accumulated_flow: f64,
    pub element_pressure_loss: Option<f64>,
    pub path_pressure_loss: f64,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<NodeExport>,
}

/// Export the tree keyed by system name; each entry is the subtree below
/// the system node, starting at the air-handling unit.
pub fn export_tree(tree: &ConnectivityTree) -> BTreeMap<String, Vec<NodeExport>> {
    tree.systems()
        .map(|(name, key)| {
            let subtrees = tree
                .children(key)
                .iter()
                .filter_map(|&child| export_node(tree, child))
                .collect();
            (name.to_string(), subtrees)
        })
        .collect()
}

fn export_node(tree: &ConnectivityTree, key: NodeKey) -> Option<NodeExport> {
    let node = tree.node(key)?;
    Some(NodeExport {
        identifier: node.identifier.clone(),
        element_id: node.element.clone(),
        ifc_type: node.ifc_type().to_string(),
        accumulated_flow: node.air_flow,
        element_pressure_loss: node.element_pressure_loss,
        path_pressure_loss: node.path_pressure_loss,
        children: node
            .children()
            .iter()
            .filter_map(|&child| export_node(tree, child))
            .collect(),
    })
}

/// A titled plain-text table
#[derive(Debug, Clone, PartialEq)]
pub struct TextTable {
    pub title: String,
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl TextTable {
    pub fn new(title: &str, headers: &[&str]) -> Self {
        Self {
            title: title.to_string(),
            headers: headers.iter().map(|h| h.to_string()).collect(),
            rows: Vec::new(),
        }
    }

    pub fn add_row(&mut self, row: Vec<String>) {
        self.rows.push(row);
    }

    fn widths(&self) -> Vec<usize> {
        let mut widths: Vec<usize> = self.headers.iter().map(|h| h.chars().count()).collect();
        for row in &self.rows {
            for (i, cell) in row.iter().enumerate() {
                let len = cell.chars().count();
                match widths.get_mut(i) {
                    Some(w) => *w = (*w).max(len),
                    None => widths.push(len),
                }
            }
        }
        widths
    }
}

impl fmt::Display for TextTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let widths = self.widths();
        let rule: String = widths
            .iter()
            .map(|w| "-".repeat(w + 2))
            .collect::<Vec<_>>()
            .join("+");

        writeln!(f, "{}", self.title)?;
        writeln!(f, "+{}+", rule)?;
        write_cells(f, &self.headers, &widths)?;
        writeln!(f, "+{}+", rule)?;
        for row in &self.rows {
            write_cells(f, row, &widths)?;
        }
        writeln!(f, "+{}+", rule)
    }
}

fn write_cells(f: &mut fmt::Formatter<'_>, cells: &[String], widths: &[usize]) -> fmt::Result {
    write!(f, "|")?;
    for (i, width) in widths.iter().enumerate() {
        let cell = cells.get(i).map(String::as_str).unwrap_or("");
        write!(f, " {:<width$} |", cell, width = width)?;
    }
    writeln!(f)
}

/// "Distribution systems" table
pub fn system_table(rows: &[SystemRow]) -> TextTable {
    let mut table = TextTable::new(
        "Distribution Systems",
        &["System", "Elements", "Element Types", "AHU Found"],
    );
    for row in rows {
        table.add_row(vec![
            row.system_name.clone(),
            row.element_count.to_string(),
            row.element_types.join(", "),
            if row.is_identified { "yes" } else { "no" }.to_string(),
        ]);
    }
    table
}

/// "AHU elements and their systems" table
pub fn pairing_table(pairings: &[AhuPairing]) -> TextTable {
    let mut table = TextTable::new(
        "AHU Elements and Their Systems",
        &["AHU", "Supply System", "Return System"],
    );
    let describe = |system: &Option<String>, count: usize| match system {
        Some(name) => format!("{} ({})", name, count),
        None => "-".to_string(),
    };
    for pairing in pairings {
        table.add_row(vec![
            pairing.unit.to_string(),
            describe(&pairing.supply_system, pairing.supply_count),
            describe(&pairing.return_system, pairing.return_count),
        ]);
    }
    table
}

/// "Air terminals in spaces" table with a closing unassigned row
pub fn space_terminal_table(map: &SpaceTerminalMap) -> TextTable {
    let mut table = TextTable::new(
        "Air Terminals in Spaces",
        &["Space", "Supply Air Terminals", "Return Air Terminals"],
    );
    for entry in map.spaces() {
        table.add_row(vec![
            entry.name.clone(),
            entry.terminals.supply.len().to_string(),
            entry.terminals.return_.len().to_string(),
        ]);
    }
    table.add_row(vec![
        "Unassigned".to_string(),
        map.unassigned().supply.len().to_string(),
        map.unassigned().return_.len().to_string(),
    ]);
    table
}

/// "Required air flows per space" table
pub fn air_flow_table(flows: &[SpaceAirFlow]) -> TextTable {
    let mut table = TextTable::new(
        "Required Air Flows per Space",
        &[
            "Space",
            "Area (m²)",
            "Occupancy",
            "Required (l/s)",
            "Supply",
            "Supply (l/s term.)",
            "Return",
            "Return (l/s term.)",
        ],
    );
    for flow in flows {
        table.add_row(vec![
            flow.name.clone(),
            format!("{:.2}", flow.area),
            format!("{:.2}", flow.occupancy),
            format!("{:.2}", flow.required_flow),
            flow.supply_count.to_string(),
            format!("{:.2}", flow.supply_share),
            flow.return_count.to_string(),
            format!("{:.2}", flow.return_share),
        ]);
    }
    table
}
