// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! End-to-end analysis of a small office floor.
//!
//! Supply `360.VI.01`: ahu -> d1 -> f1 -> { d2 -> t1, d3 -> { t2, t3, t-out } }
//! Return `360.VU.01`: tr1 -> r1 -> ahu
//! `360.VU.02` has no air-handling unit.

use approx::assert_relative_eq;
use ifc_lite_hvac_model::{GlobalId, ModelSnapshot, ModelStore, PropertyValue};
use ifc_lite_ventilation::pressure::straight_duct_pressure_loss;
use ifc_lite_ventilation::{
    AnalysisReport, AnalysisSettings, DuctGeometry, FlowDirection, IssueKind, OccupancySource,
    VentilationAnalyzer, VentilationCategory,
};
use serde_json::json;

const DIMENSIONING: &str = "Pset_SpaceAirHandlingDimensioning";

fn id(s: &str) -> GlobalId {
    GlobalId::from(s)
}

fn terminal(id: &str, min: [f64; 3], max: [f64; 3]) -> serde_json::Value {
    json!({ "id": id, "ifc_type": "IfcAirTerminal", "bounding_box": { "min": min, "max": max } })
}

fn round_duct(id: &str, radius_mm: f64, length_mm: f64) -> serde_json::Value {
    json!({
        "id": id,
        "ifc_type": "IfcDuctSegment",
        "profile": { "profile": { "type": "Circle", "radius": radius_mm }, "depth": length_mm }
    })
}

fn mep_model() -> ModelSnapshot {
    let doc = json!({
        "length_unit_scale": 0.001,
        "elements": [
            { "id": "ahu", "ifc_type": "IfcUnitaryEquipment", "object_type": "Geniox 14" },
            round_duct("d1", 125.0, 3000.0),
            {
                "id": "f1", "ifc_type": "IfcDuctFitting",
                "ports": [ { "position": [0.0, 0.0, 3.0] }, { "position": [1.0, 0.0, 3.0] } ]
            },
            round_duct("d2", 100.0, 2000.0),
            {
                "id": "d3", "ifc_type": "IfcDuctSegment",
                "profile": { "profile": { "type": "Rectangle", "x_dim": 300.0, "y_dim": 200.0 }, "depth": 6000.0 }
            },
            terminal("t1", [1.0, 1.0, 2.6], [1.6, 1.6, 2.8]),
            terminal("t2", [6.0, 1.0, 2.6], [6.6, 1.6, 2.8]),
            terminal("t3", [10.0, 1.0, 2.6], [10.6, 1.6, 2.8]),
            terminal("t-out", [40.0, 40.0, 2.6], [40.6, 40.6, 2.8]),
            { "id": "p1", "ifc_type": "IfcDistributionPort" },
            round_duct("r1", 100.0, 4000.0),
            terminal("tr1", [3.0, 2.0, 2.6], [3.6, 2.6, 2.8]),
            { "id": "x1", "ifc_type": "IfcDuctSegment" }
        ],
        "systems": [
            { "name": "360.VI.01", "elements": ["ahu", "p1", "d1", "f1", "d2", "d3", "t1", "t2", "t3", "t-out"] },
            { "name": "360.VU.01", "elements": ["ahu", "r1", "tr1"] },
            { "name": "360.VU.02", "elements": ["x1"] }
        ],
        "connections": [
            { "from": "ahu", "to": "d1" },
            { "from": "d1", "to": "f1" },
            { "from": "f1", "to": "d2" },
            { "from": "d2", "to": "t1" },
            { "from": "f1", "to": "d3" },
            { "from": "d3", "to": "t2" },
            { "from": "d3", "to": "t3" },
            { "from": "d3", "to": "t-out" },
            { "from": "tr1", "to": "r1" },
            { "from": "r1", "to": "ahu" }
        ]
    });
    ModelSnapshot::from_json(&doc.to_string()).unwrap()
}

fn arch_model() -> ModelSnapshot {
    let doc = json!({
        "elements": [
            {
                "id": "s-meet", "ifc_type": "IfcSpace", "name": "0.01", "long_name": "Meeting Room",
                "bounding_box": { "min": [0.0, 0.0, 0.0], "max": [5.0, 4.0, 2.7] },
                "quantities": { "Qto_SpaceBaseQuantities": { "GrossFloorArea": 20.0 } }
            },
            {
                "id": "s-store", "ifc_type": "IfcSpace", "name": "0.02", "long_name": "Storage",
                "bounding_box": { "min": [5.5, 0.0, 0.0], "max": [15.0, 5.0, 2.7] },
                "quantities": { "Qto_SpaceBaseQuantities": { "GrossFloorArea": 50.0 } }
            },
            {
                "id": "s-roof", "ifc_type": "IfcSpace", "long_name": "Rooftop Terrace",
                "bounding_box": { "min": [-100.0, -100.0, -10.0], "max": [100.0, 100.0, 10.0] }
            },
            { "id": "c1", "ifc_type": "IfcFurniture", "name": "Chair:Task Chair:1" },
            { "id": "c2", "ifc_type": "IfcFurniture", "name": "Chair:Task Chair:2" },
            { "id": "c3", "ifc_type": "IfcFurniture", "name": "Chair:Task Chair:3" },
            { "id": "c4", "ifc_type": "IfcFurniture", "name": "Chair:Task Chair:4" },
            { "id": "desk", "ifc_type": "IfcFurniture", "name": "Table:Meeting Table:1" }
        ],
        "containment": [
            { "container": "s-meet", "elements": ["c1", "c2", "c3", "c4", "desk"] }
        ]
    });
    ModelSnapshot::from_json(&doc.to_string()).unwrap()
}

fn analyse(mep: &ModelSnapshot, arch: &ModelSnapshot) -> AnalysisReport {
    VentilationAnalyzer::new(AnalysisSettings::default()).run(mep, arch)
}

fn flow_of(report: &AnalysisReport, identifier: &str) -> f64 {
    let key = report.tree.find(identifier).unwrap();
    report.tree.node(key).unwrap().air_flow
}

#[test]
fn classification_of_the_floor() {
    let (mep, arch) = (mep_model(), arch_model());
    let report = analyse(&mep, &arch);

    let c = &report.classification;
    assert_eq!(c.identified.len(), 2);
    assert!(c.missing.contains_key("360.VU.02"));
    assert_eq!(c.identified["360.VI.01"].element_count(), 9);
    assert_eq!(c.pairings.len(), 1);
    assert_eq!(c.pairings[0].supply_system.as_deref(), Some("360.VI.01"));
    assert_eq!(c.pairings[0].return_system.as_deref(), Some("360.VU.01"));
}

#[test]
fn space_air_flows() {
    let (mep, arch) = (mep_model(), arch_model());
    let report = analyse(&mep, &arch);

    assert_eq!(report.space_flows.len(), 2);

    let meeting = &report.space_flows[0];
    assert_eq!(meeting.space, id("s-meet"));
    assert_eq!(meeting.occupancy_source, OccupancySource::Counted);
    assert_relative_eq!(meeting.occupancy, 4.0);
    assert_relative_eq!(meeting.required_flow, 42.0);
    assert_eq!((meeting.supply_count, meeting.return_count), (1, 1));
    assert_relative_eq!(meeting.supply_share, 42.0);
    assert_relative_eq!(meeting.return_share, 42.0);

    let storage = &report.space_flows[1];
    assert_eq!(storage.occupancy_source, OccupancySource::Backup);
    assert_relative_eq!(storage.occupancy, 5.0);
    assert_relative_eq!(storage.required_flow, 42.0);
    assert_eq!(storage.supply_count, 2);
    assert_relative_eq!(storage.supply_share, 21.0);
    assert_eq!(storage.return_count, 0);
    assert_eq!(storage.return_share, 0.0);
}

#[test]
fn every_terminal_is_placed_once() {
    let (mep, arch) = (mep_model(), arch_model());
    let report = analyse(&mep, &arch);

    let mut placed: Vec<GlobalId> = Vec::new();
    for space in report.terminals.spaces() {
        for direction in FlowDirection::ALL {
            placed.extend(space.terminals.get(direction).iter().cloned());
        }
    }
    for direction in FlowDirection::ALL {
        placed.extend(report.terminals.unassigned().get(direction).iter().cloned());
    }
    placed.sort();

    let mut expected = vec![id("t1"), id("t2"), id("t3"), id("t-out"), id("tr1")];
    expected.sort();
    assert_eq!(placed, expected);
    assert_eq!(report.terminals.unassigned().supply, vec![id("t-out")]);
}

#[test]
fn flows_accumulate_towards_the_unit() {
    let (mep, arch) = (mep_model(), arch_model());
    let report = analyse(&mep, &arch);

    assert_relative_eq!(flow_of(&report, "t1"), 42.0);
    assert_relative_eq!(flow_of(&report, "t2"), 21.0);
    assert_relative_eq!(flow_of(&report, "t-out"), 0.0);
    assert_relative_eq!(flow_of(&report, "d3"), 42.0);
    assert_relative_eq!(flow_of(&report, "f1"), 84.0);
    assert_relative_eq!(flow_of(&report, "d1"), 84.0);
    assert_relative_eq!(flow_of(&report, "360.VI.01_ahu"), 84.0);
    assert_relative_eq!(flow_of(&report, "360.VU.01_ahu"), 42.0);
    assert_relative_eq!(flow_of(&report, "r1"), 42.0);

    assert!(report.tree_failures.is_empty());
    assert_eq!(report.propagation.paths, 5);
    assert_eq!(report.propagation.matched_paths, 4);
    assert_eq!(report.propagation.unmatched_terminals, vec![id("t-out")]);
}

#[test]
fn pressure_losses_follow_the_path() {
    let (mep, arch) = (mep_model(), arch_model());
    let report = analyse(&mep, &arch);
    let node = |name: &str| report.tree.node(report.tree.find(name).unwrap()).unwrap();

    let d1 = DuctGeometry::circular(0.25, 3.0).unwrap();
    let d2 = DuctGeometry::circular(0.2, 2.0).unwrap();
    let d1_loss = straight_duct_pressure_loss(84.0, &d1).unwrap();
    let d2_loss = straight_duct_pressure_loss(42.0, &d2).unwrap();
    assert_relative_eq!(node("d1").element_pressure_loss.unwrap(), d1_loss, max_relative = 1e-9);
    assert_relative_eq!(node("d2").element_pressure_loss.unwrap(), d2_loss, max_relative = 1e-9);
    assert_relative_eq!(node("f1").element_pressure_loss.unwrap(), 10.0);

    assert_relative_eq!(
        node("t1").path_pressure_loss,
        d1_loss + 10.0 + d2_loss + 0.2,
        max_relative = 1e-9
    );
    assert_relative_eq!(node("360.VI.01_ahu").path_pressure_loss, 0.0);
}

#[test]
fn issues_for_missing_units_and_stray_terminals() {
    let (mep, arch) = (mep_model(), arch_model());
    let report = analyse(&mep, &arch);

    let kinds: Vec<(IssueKind, &str)> = report
        .issues
        .iter()
        .map(|i| (i.kind, i.category.as_str()))
        .collect();
    assert_eq!(
        kinds,
        vec![
            (IssueKind::MissingAirHandlingUnit, "Missing AHU - 360.VU.02"),
            (IssueKind::UnassignedTerminal, "Unassigned Terminals - Supply"),
        ]
    );
}

#[test]
fn write_back_is_idempotent() {
    let (mut mep, mut arch) = (mep_model(), arch_model());
    let report = analyse(&mep, &arch);

    for _ in 0..2 {
        assert_eq!(report.commit_space_properties(&mut arch).unwrap(), 2);
        assert_eq!(report.commit_terminal_properties(&mut mep).unwrap(), 5);
    }

    let meeting = arch.element(&id("s-meet")).unwrap();
    assert_eq!(meeting.properties.len(), 2);
    assert_eq!(
        arch.property_value(&id("s-meet"), "Pset_SpaceOccupancyRequirements", "OccupancyNumber"),
        Some(&PropertyValue::Integer(4))
    );
    assert_eq!(
        arch.property_value(&id("s-store"), "Pset_SpaceOccupancyRequirements", "OccupancyNumber"),
        Some(&PropertyValue::Real(5.0))
    );
    assert_eq!(
        arch.property_value(&id("s-store"), DIMENSIONING, "DesignAirFlow"),
        Some(&PropertyValue::Real(42.0))
    );

    let t2 = mep.element(&id("t2")).unwrap();
    assert_eq!(t2.properties["Pset_AirTerminalOccurrence"].len(), 3);
    assert_eq!(
        mep.property_value(&id("t2"), "Pset_AirTerminalOccurrence", "AirFlowRate"),
        Some(&PropertyValue::Real(21.0))
    );

    // Results survive a save and reload
    let reloaded = ModelSnapshot::from_json(&arch.to_json().unwrap()).unwrap();
    assert_eq!(
        reloaded.property_value(&id("s-meet"), DIMENSIONING, "DesignAirFlow"),
        Some(&PropertyValue::Real(42.0))
    );
}

#[test]
fn one_store_can_serve_both_roles() {
    let mut combined = mep_model();
    let arch = arch_model();
    for id in arch.elements_by_type(&ifc_lite_hvac_model::ElementKind::Space) {
        combined.add_element(arch.element(&id).unwrap().clone()).unwrap();
    }

    let report = analyse(&combined, &combined);
    assert_eq!(report.space_flows.len(), 2);
    // No chairs in the combined store, so the meeting room falls back to its density
    assert_eq!(
        report.space_flows[0].occupancy_source,
        OccupancySource::Density { label: "Meeting Room".to_string() }
    );
    assert_relative_eq!(report.space_flows[0].occupancy, 10.0);

    assert_eq!(report.commit_space_properties(&mut combined).unwrap(), 2);
}

#[test]
fn category_changes_rates() {
    let (mep, arch) = (mep_model(), arch_model());
    let settings = AnalysisSettings::default().with_category(VentilationCategory::I);
    let report = VentilationAnalyzer::new(settings).run(&mep, &arch);

    // 4 * 10 + 20 * 1.0
    assert_relative_eq!(report.space_flows[0].required_flow, 60.0);
    assert_eq!(report.category, VentilationCategory::I);
}

#[test]
fn report_exports_to_json() {
    let (mep, arch) = (mep_model(), arch_model());
    let report = analyse(&mep, &arch);
    let value: serde_json::Value = serde_json::from_str(&report.to_json().unwrap()).unwrap();

    assert_eq!(value["category"], "II");
    assert_eq!(value["systems"].as_array().unwrap().len(), 3);
    let supply_tree = &value["tree"]["360.VI.01"][0];
    assert_eq!(supply_tree["identifier"], "360.VI.01_ahu");
    assert_eq!(supply_tree["accumulated_flow"], 84.0);
    assert_eq!(supply_tree["children"][0]["element_id"], "d1");
}
