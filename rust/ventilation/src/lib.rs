// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! # IFC-Lite Ventilation
//!
//! Ventilation system analysis for IFC building models.
//!
//! Given an MEP model with ventilation systems and an architectural model
//! with spaces, the analysis:
//!
//! 1. Classifies distribution systems by whether they contain an
//!    air-handling unit, and pairs supply and return systems sharing a unit
//!    ([`classifier`]).
//! 2. Assigns air terminals to the spaces they sit in by bounding-box overlap
//!    ([`clash`]).
//! 3. Estimates the required design air flow of every served space from its
//!    floor area and occupancy ([`airflow`]).
//! 4. Builds a downstream connectivity tree from each air-handling unit
//!    ([`tree`]).
//! 5. Propagates terminal flow shares and pressure losses through the trees
//!    ([`propagate`], [`pressure`]).
//!
//! ## Quick Start
//!
//! ```no_run
//! use ifc_lite_hvac_model::ModelSnapshot;
//! use ifc_lite_ventilation::{AnalysisSettings, VentilationAnalyzer};
//!
//! let mut mep = ModelSnapshot::from_path("mep.json")?;
//! let mut arch = ModelSnapshot::from_path("arch.json")?;
//!
//! let report = VentilationAnalyzer::new(AnalysisSettings::default()).run(&mep, &arch);
//! for flow in &report.space_flows {
//!     println!("{}: {:.1} l/s", flow.name, flow.required_flow);
//! }
//!
//! report.commit_space_properties(&mut arch)?;
//! report.commit_terminal_properties(&mut mep)?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod airflow;
pub mod clash;
pub mod classifier;
pub mod direction;
pub mod error;
pub mod geometry;
pub mod issues;
pub mod pipeline;
pub mod pressure;
pub mod propagate;
pub mod report;
pub mod tree;

pub use airflow::{
    estimate_space_flows, per_terminal_share, required_air_flow, AirFlowSettings, Occupancy,
    OccupancyDensities, OccupancySource, SpaceAirFlow, VentilationCategory,
};
pub use clash::{resolve_terminals, ClashSettings, SpaceTerminalMap, SpaceTerminals, TerminalSet};
pub use classifier::{
    classify_systems, is_air_handling_unit, AhuPairing, Classification, SystemInfo,
    VENDOR_AHU_MARKERS,
};
pub use direction::{FlowDirection, NamingConvention};
pub use error::{Error, Result};
pub use geometry::{DuctGeometry, DuctShape, FittingShape, GeometryAdapter};
pub use issues::{collect_issues, Issue, IssueKind};
pub use pipeline::{AnalysisReport, AnalysisSettings, ReportExport, VentilationAnalyzer};
pub use propagate::{propagate, PropagationSummary, TerminalShares};
pub use report::{NodeExport, SystemRow, TextTable};
pub use tree::{
    build_system_tree, build_trees, ConnectivityTree, NodeKey, NodeRole, TreeBuild, TreeNode,
    TreeProperty,
};
