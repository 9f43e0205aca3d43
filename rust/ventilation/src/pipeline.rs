// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Analysis pipeline.
//!
//! [`VentilationAnalyzer::run`] only reads from the model stores. Results are
//! written back afterwards, in a fixed order, through the
//! [`AnalysisReport::commit_space_properties`] and
//! [`AnalysisReport::commit_terminal_properties`] steps.

use std::collections::BTreeMap;

use ifc_lite_hvac_model::{ElementKind, ModelStore, ModelWrite, PropertyValue};
use serde::{Deserialize, Serialize};

use crate::airflow::{
    estimate_space_flows, AirFlowSettings, OccupancySource, SpaceAirFlow, VentilationCategory,
};
use crate::classifier::{classify_systems, AhuPairing, Classification};
use crate::clash::{resolve_terminals, ClashSettings, SpaceTerminalMap, SpaceTerminals, TerminalSet};
use crate::direction::NamingConvention;
use crate::error::{Error, Result};
use crate::geometry::{round2, GeometryAdapter};
use crate::issues::{collect_issues, Issue};
use crate::propagate::{propagate, PropagationSummary, TerminalShares};
use crate::report::{export_tree, system_rows, NodeExport, SystemRow};
use crate::tree::{build_trees, ConnectivityTree, TreeBuild};

/// Occupancy property set written onto spaces
pub const OCCUPANCY_PSET: &str = "Pset_SpaceOccupancyRequirements";
pub const OCCUPANCY_NUMBER: &str = "OccupancyNumber";
/// Air-flow dimensioning property set written onto spaces
pub const DIMENSIONING_PSET: &str = "Pset_SpaceAirHandlingDimensioning";
pub const DESIGN_AIR_FLOW: &str = "DesignAirFlow";
/// Property set written onto air terminals
pub const TERMINAL_PSET: &str = "Pset_AirTerminalOccurrence";
pub const AIR_FLOW_RATE: &str = "AirFlowRate";
pub const ELEMENT_PRESSURE_LOSS: &str = "ElementPressureLoss";
pub const PATH_PRESSURE_LOSS: &str = "PathPressureLoss";

/// Settings for one analysis run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalysisSettings {
    pub naming: NamingConvention,
    pub clash: ClashSettings,
    pub air_flow: AirFlowSettings,
}

impl AnalysisSettings {
    pub fn with_category(mut self, category: VentilationCategory) -> Self {
        self.air_flow.category = category;
        self
    }
}

/// Runs the full ventilation analysis
#[derive(Debug, Clone, Default)]
pub struct VentilationAnalyzer {
    settings: AnalysisSettings,
}

impl VentilationAnalyzer {
    pub fn new(settings: AnalysisSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &AnalysisSettings {
        &self.settings
    }

    /// Analyse the ventilation systems of `mep` against the spaces of `arch`.
    ///
    /// Both may be the same store. Nothing is written.
    pub fn run(&self, mep: &dyn ModelStore, arch: &dyn ModelStore) -> AnalysisReport {
        let settings = &self.settings;
        tracing::info!(category = %settings.air_flow.category, "starting ventilation analysis");

        let classification = classify_systems(mep, &settings.naming);

        let mut mep_geometry = GeometryAdapter::new(mep);
        let mut arch_geometry = GeometryAdapter::new(arch);
        let terminals = resolve_terminals(
            &mut mep_geometry,
            &mut arch_geometry,
            &classification,
            &settings.clash,
        );

        let space_flows = estimate_space_flows(arch, &terminals, &settings.air_flow);

        let TreeBuild { mut tree, failures } =
            build_trees(&mut mep_geometry, &classification, &settings.naming);
        let shares = TerminalShares::new(&terminals, &space_flows);
        let propagation = propagate(&mut tree, &shares);

        let issues = collect_issues(&classification, &terminals);
        tracing::info!(issues = issues.len(), "ventilation analysis complete");

        AnalysisReport {
            category: settings.air_flow.category,
            classification,
            terminals,
            space_flows,
            tree,
            tree_failures: failures,
            propagation,
            issues,
        }
    }
}

/// Everything one analysis run produced
#[derive(Debug)]
pub struct AnalysisReport {
    pub category: VentilationCategory,
    pub classification: Classification,
    pub terminals: SpaceTerminalMap,
    /// Spaces with at least one terminal, in order of first assignment
    pub space_flows: Vec<SpaceAirFlow>,
    pub tree: ConnectivityTree,
    /// Systems whose tree could not be built
    pub tree_failures: Vec<(String, Error)>,
    pub propagation: PropagationSummary,
    pub issues: Vec<Issue>,
}

/// Serializable view of an [`AnalysisReport`]
#[derive(Debug, Clone, Serialize)]
pub struct ReportExport {
    pub category: VentilationCategory,
    pub systems: Vec<SystemRow>,
    pub pairings: Vec<AhuPairing>,
    pub spaces: Vec<SpaceTerminals>,
    pub unassigned_terminals: TerminalSet,
    pub space_flows: Vec<SpaceAirFlow>,
    pub tree: BTreeMap<String, Vec<NodeExport>>,
    pub tree_failures: BTreeMap<String, String>,
    pub propagation: PropagationSummary,
    pub issues: Vec<Issue>,
}

impl AnalysisReport {
    pub fn export(&self) -> ReportExport {
        ReportExport {
            category: self.category,
            systems: system_rows(&self.classification),
            pairings: self.classification.pairings.clone(),
            spaces: self.terminals.spaces().to_vec(),
            unassigned_terminals: self.terminals.unassigned().clone(),
            space_flows: self.space_flows.clone(),
            tree: export_tree(&self.tree),
            tree_failures: self
                .tree_failures
                .iter()
                .map(|(system, error)| (system.clone(), error.to_string()))
                .collect(),
            propagation: self.propagation.clone(),
            issues: self.issues.clone(),
        }
    }

    /// Pretty-printed JSON of [`AnalysisReport::export`]
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(&self.export())
    }

    /// Write occupancy and design air flow onto every estimated space.
    ///
    /// Returns the number of spaces written. Re-running overwrites the
    /// previous values.
    pub fn commit_space_properties(&self, arch: &mut dyn ModelWrite) -> Result<usize> {
        for flow in &self.space_flows {
            let occupancy = match flow.occupancy_source {
                OccupancySource::Counted => PropertyValue::Integer(flow.occupancy.round() as i64),
                _ => PropertyValue::Real(round2(flow.occupancy)),
            };
            arch.write_property(&flow.space, OCCUPANCY_PSET, OCCUPANCY_NUMBER, occupancy)?;
            arch.write_property(
                &flow.space,
                DIMENSIONING_PSET,
                DESIGN_AIR_FLOW,
                PropertyValue::Real(round2(flow.required_flow)),
            )?;
        }
        tracing::info!(spaces = self.space_flows.len(), "wrote space air-flow properties");
        Ok(self.space_flows.len())
    }

    /// Write flow and pressure results onto every air terminal in the tree,
    /// in tree pre-order.
    ///
    /// Returns the number of terminals written.
    pub fn commit_terminal_properties(&self, mep: &mut dyn ModelWrite) -> Result<usize> {
        let mut written = 0;
        for key in self.tree.pre_order() {
            let Some(node) = self.tree.node(key) else {
                continue;
            };
            let Some(element) = node.element.as_ref() else {
                continue;
            };
            if node.kind != ElementKind::AirTerminal {
                continue;
            }
            let flow = PropertyValue::Real(round2(node.air_flow));
            mep.write_property(element, TERMINAL_PSET, AIR_FLOW_RATE, flow)?;
            if let Some(loss) = node.element_pressure_loss {
                let loss = PropertyValue::Real(round2(loss));
                mep.write_property(element, TERMINAL_PSET, ELEMENT_PRESSURE_LOSS, loss)?;
            }
            mep.write_property(
                element,
                TERMINAL_PSET,
                PATH_PRESSURE_LOSS,
                PropertyValue::Real(round2(node.path_pressure_loss)),
            )?;
            written += 1;
        }
        tracing::info!(terminals = written, "wrote air terminal properties");
        Ok(written)
    }
}
