// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Store queries against a snapshot file on disk.

use approx::assert_relative_eq;
use ifc_lite_hvac_model::{
    Containment, ElementKind, Error, GlobalId, ModelSnapshot, ModelStore, ModelWrite, ProfileDef,
    PropertyValue,
};

const DOC: &str = r#"{
    "length_unit_scale": 0.001,
    "elements": [
        { "id": "site-storey", "ifc_type": "IFCBUILDINGSTOREY", "name": "Level 2", "elevation": 3600.0 },
        { "id": "ahu", "ifc_type": "IfcUnitaryEquipment", "object_type": "Geniox 20" },
        { "id": "bend", "ifc_type": "IfcDuctFitting",
          "ports": [ { "name": "in", "position": [0.0, 0.0, 3.0] }, { "name": "out", "position": [0.5, 0.5, 3.0] } ] },
        { "id": "duct", "ifc_type": "IfcDuctSegment",
          "profile": { "profile": { "type": "Rectangle", "x_dim": 400.0, "y_dim": 250.0 }, "depth": 1800.0 },
          "bounding_box": { "min": [0.5, 0.5, 2.9], "max": [2.3, 0.9, 3.15] } },
        { "id": "oval", "ifc_type": "IfcDuctSegment",
          "profile": { "profile": { "type": "Other", "name": "IfcEllipseProfileDef" }, "depth": 900.0 } },
        { "id": "broken-box", "ifc_type": "IfcAirTerminal",
          "bounding_box": { "min": [1.0, 1.0, 1.0], "max": [0.0, 0.0, 0.0] } },
        { "id": "office", "ifc_type": "IfcSpace", "name": "2.04", "long_name": "Closed Office",
          "quantities": { "Qto_SpaceBaseQuantities": { "GrossFloorArea": 12.5, "NetFloorArea": 12 } } }
    ],
    "systems": [
        { "name": "360.VI.02", "elements": ["ahu", "bend", "duct"] },
        { "name": "360.VU.02", "elements": ["ahu"] }
    ],
    "connections": [
        { "from": "ahu", "to": "bend" },
        { "from": "bend", "to": "duct" }
    ],
    "containment": [
        { "container": "site-storey", "elements": ["ahu", "bend", "duct", "office"] }
    ]
}"#;

const DIMENSIONING: &str = "Pset_SpaceAirHandlingDimensioning";

fn id(s: &str) -> GlobalId {
    GlobalId::from(s)
}

fn temp_path(name: &str) -> std::path::PathBuf {
    std::env::temp_dir().join(format!("ifc-lite-hvac-model-{}-{}", std::process::id(), name))
}

#[test]
fn snapshot_file_round_trip() {
    let path = temp_path("round-trip.json");
    std::fs::write(&path, DOC).unwrap();

    let mut model = ModelSnapshot::from_path(&path).unwrap();
    model
        .write_property(&id("office"), DIMENSIONING, "DesignAirFlow", PropertyValue::Real(29.5))
        .unwrap();
    model.write_to_path(&path).unwrap();

    let reloaded = ModelSnapshot::from_path(&path).unwrap();
    std::fs::remove_file(&path).unwrap();

    assert_eq!(reloaded.element_count(), 7);
    assert_eq!(
        reloaded.property_value(&id("office"), DIMENSIONING, "DesignAirFlow"),
        Some(&PropertyValue::Real(29.5))
    );
    assert_eq!(reloaded.connected_from(&id("ahu")), vec![id("bend")]);
}

#[test]
fn missing_file_is_an_io_error() {
    let err = ModelSnapshot::from_path(temp_path("does-not-exist.json")).unwrap_err();
    assert!(matches!(err, Error::Io(_)));
}

#[test]
fn malformed_document_is_a_serialization_error() {
    let err = ModelSnapshot::from_json(r#"{ "elements": [ { "id": 5 } ] }"#).unwrap_err();
    assert!(matches!(err, Error::Serialization(_)));
}

#[test]
fn geometry_queries() {
    let model = ModelSnapshot::from_json(DOC).unwrap();

    assert_relative_eq!(model.length_unit_scale(), 0.001);

    let bounds = model.world_bounding_box(&id("duct")).unwrap();
    assert_relative_eq!(bounds.max.x - bounds.min.x, 1.8, epsilon = 1e-12);
    assert_relative_eq!(bounds.height(), 0.25, epsilon = 1e-12);
    assert!(model.world_bounding_box(&id("broken-box")).is_none());

    let profile = model.profile_geometry(&id("duct")).unwrap();
    assert_eq!(profile.profile, ProfileDef::Rectangle { x_dim: 400.0, y_dim: 250.0 });
    assert_relative_eq!(profile.depth * model.length_unit_scale(), 1.8);
    assert!(matches!(
        model.profile_geometry(&id("oval")).unwrap().profile,
        ProfileDef::Other { .. }
    ));

    let ports = model.ports_of(&id("bend"));
    assert_eq!(ports.len(), 2);
    assert_relative_eq!((ports[1].position - ports[0].position).norm(), 0.5_f64.sqrt());
    assert!(model.ports_of(&id("duct")).is_empty());
}

#[test]
fn systems_connectivity_and_containment() {
    let model = ModelSnapshot::from_json(DOC).unwrap();

    let systems = model.distribution_systems();
    assert_eq!(systems.len(), 2);
    assert_eq!(systems[0].name, "360.VI.02");
    assert_eq!(model.systems_of(&id("ahu")), vec!["360.VI.02", "360.VU.02"]);

    assert_eq!(model.connected_to(&id("duct")), vec![id("bend")]);
    assert!(model.connected_from(&id("duct")).is_empty());

    assert_eq!(
        model.containing_storey(&id("office")),
        Containment::Storey { elevation: 3600.0, name: "Level 2".to_string() }
    );
    assert_eq!(model.containing_storey(&id("oval")), Containment::None);
    assert_eq!(model.elements_by_type(&ElementKind::BuildingStorey), vec![id("site-storey")]);
}

#[test]
fn integer_quantities_read_as_numbers() {
    let model = ModelSnapshot::from_json(DOC).unwrap();

    let gross = model.quantity_value(&id("office"), "Qto_SpaceBaseQuantities", "GrossFloorArea");
    let net = model.quantity_value(&id("office"), "Qto_SpaceBaseQuantities", "NetFloorArea");
    assert_relative_eq!(gross.unwrap(), 12.5);
    assert_relative_eq!(net.unwrap(), 12.0);
    assert!(model.quantity_value(&id("office"), "Qto_SpaceBaseQuantities", "Height").is_none());
}
