//! End-to-end export tests against a populated store.

use gwells_export::config::{parse_config, Config};
use gwells_export::exports::{write_exports, ExportKind};
use gwells_export::request::{resolve, ExportParams, ExportResponse, RealtimeExport};
use gwells_export::storage::{NewAquifer, NewLithology, NewWell, Store};
use gwells_export::template::BoundingBox;
use serde_json::{json, Value};
use std::fs;

fn populated_store() -> Store {
    let store = Store::in_memory().unwrap();
    store.add_code("well_status_code", "NEW", "New").unwrap();
    store
        .add_code("well_class_code", "WATR_SPPLY", "Water Supply")
        .unwrap();
    store
        .add_code("lithology_material_code", "GRAVEL", "Gravel")
        .unwrap();
    store
        .add_code("aquifer_material_code", "SG", "Sand and Gravel")
        .unwrap();

    store
        .add_well(&NewWell {
            well_tag_number: 100,
            identification_plate_number: Some(2001),
            well_status_code: Some("NEW".to_string()),
            well_class_code: Some("WATR_SPPLY".to_string()),
            finished_well_depth: Some(42.5),
            longitude: Some(-124.5),
            latitude: Some(49.0),
            ..NewWell::default()
        })
        .unwrap();
    store
        .add_well(&NewWell {
            well_tag_number: 101,
            publication_status: Some("Published".to_string()),
            longitude: Some(-123.0),
            latitude: Some(49.5),
            ..NewWell::default()
        })
        .unwrap();
    // Never exported: unpublished, and missing a location
    store
        .add_well(&NewWell {
            well_tag_number: 102,
            publication_status: Some("Unpublished".to_string()),
            longitude: Some(-124.5),
            latitude: Some(49.0),
            ..NewWell::default()
        })
        .unwrap();
    store
        .add_well(&NewWell {
            well_tag_number: 103,
            ..NewWell::default()
        })
        .unwrap();

    for (from, to) in [(0.0, 3.0), (3.0, 10.5)] {
        store
            .add_lithology(&NewLithology {
                well_tag_number: 100,
                lithology_from: Some(from),
                lithology_to: Some(to),
                material_code: Some("GRAVEL".to_string()),
                ..NewLithology::default()
            })
            .unwrap();
    }

    store
        .add_aquifer(&NewAquifer {
            aquifer_id: 7,
            name: Some("Nanaimo Lowland".to_string()),
            material_code: Some("SG".to_string()),
            mapping_year: Some(1994),
            geometry: Some(json!({
                "type": "Polygon",
                "coordinates": [[[-124.8, 49.1], [-124.6, 49.1], [-124.6, 49.3], [-124.8, 49.1]]]
            })),
            ..NewAquifer::default()
        })
        .unwrap();
    store
        .add_aquifer(&NewAquifer {
            aquifer_id: 8,
            name: Some("Fraser Valley".to_string()),
            geometry: Some(json!({
                "type": "Polygon",
                "coordinates": [[[-122.5, 49.0], [-122.0, 49.0], [-122.0, 49.2], [-122.5, 49.0]]]
            })),
            ..NewAquifer::default()
        })
        .unwrap();
    store
}

fn realtime(kind: ExportKind, bounds: Option<BoundingBox>, config: &Config) -> RealtimeExport {
    let params = ExportParams {
        realtime: true,
        bounds,
    };
    match resolve(kind, &params, config).unwrap() {
        ExportResponse::Stream(export) => export,
        ExportResponse::Redirect { location } => panic!("Unexpected redirect to {}", location),
    }
}

fn run(store: &Store, export: &RealtimeExport) -> Value {
    let mut buf = Vec::new();
    export.write_to(store.connection(), &mut buf).unwrap();
    serde_json::from_slice(&buf).unwrap()
}

fn tags(doc: &Value) -> Vec<i64> {
    doc["features"]
        .as_array()
        .unwrap()
        .iter()
        .map(|f| f["properties"]["well_tag_number"].as_i64().unwrap())
        .collect()
}

#[test]
fn test_realtime_wells_export() {
    let store = populated_store();
    let doc = run(&store, &realtime(ExportKind::Wells, None, &Config::default()));

    assert_eq!(doc["type"], "FeatureCollection");
    assert_eq!(tags(&doc), vec![100, 101]);

    let first = &doc["features"][0];
    assert_eq!(first["type"], "Feature");
    assert_eq!(
        first["geometry"],
        json!({"type": "Point", "coordinates": [-124.5, 49.0]})
    );
    let properties = first["properties"].as_object().unwrap();
    assert!(!properties.contains_key("geometry"));
    assert_eq!(properties["identification_plate_number"], 2001);
    assert_eq!(properties["well_status"], "New");
    assert_eq!(properties["well_class"], "Water Supply");
    assert_eq!(properties["finished_well_depth"], 42.5);
    assert_eq!(properties["artesian_flow_units"], "usGPM");
    assert_eq!(
        properties["detail"],
        "https://apps.nrs.gov.bc.ca/gwells/well/100"
    );
    assert_eq!(properties["licenced_status"], Value::Null);
}

#[test]
fn test_realtime_wells_within_bounds() {
    let store = populated_store();
    let bounds = BoundingBox::new(-125.0, 49.0, -124.0, 49.0);
    let doc = run(
        &store,
        &realtime(ExportKind::Wells, Some(bounds), &Config::default()),
    );
    assert_eq!(tags(&doc), vec![100]);
}

#[test]
fn test_realtime_empty_bounds_yield_empty_collection() {
    let store = populated_store();
    let bounds = BoundingBox::new(0.0, 0.0, 1.0, 1.0);
    let export = realtime(ExportKind::Wells, Some(bounds), &Config::default());

    let mut buf = Vec::new();
    let features = export.write_to(store.connection(), &mut buf).unwrap();
    assert_eq!(features, 0);
    insta::assert_snapshot!(String::from_utf8(buf).unwrap(), @r#"{"type": "FeatureCollection","features": []}"#);
}

#[test]
fn test_realtime_lithology_export() {
    let store = populated_store();
    let doc = run(
        &store,
        &realtime(ExportKind::Lithology, None, &Config::default()),
    );
    let features = doc["features"].as_array().unwrap();
    assert_eq!(features.len(), 2);
    assert_eq!(features[0]["properties"]["from"], 0.0);
    assert_eq!(features[1]["properties"]["to"], 10.5);
    assert_eq!(features[1]["properties"]["material"], "Gravel");
    assert_eq!(features[1]["properties"]["aquifer"], Value::Null);
}

#[test]
fn test_realtime_aquifers_within_bounds() {
    let store = populated_store();
    let all = run(
        &store,
        &realtime(ExportKind::Aquifers, None, &Config::default()),
    );
    assert_eq!(all["features"].as_array().unwrap().len(), 2);
    assert_eq!(all["features"][0]["geometry"]["type"], "Polygon");
    assert_eq!(all["features"][0]["properties"]["material"], "Sand and Gravel");

    let island = BoundingBox::new(-125.0, 49.0, -124.0, 49.5);
    let doc = run(
        &store,
        &realtime(ExportKind::Aquifers, Some(island), &Config::default()),
    );
    let features = doc["features"].as_array().unwrap();
    assert_eq!(features.len(), 1);
    assert_eq!(features[0]["properties"]["aquifer_id"], 7);
    assert_eq!(features[0]["properties"]["name"], "Nanaimo Lowland");
    assert_eq!(features[0]["properties"]["mapping_year"], 1994);
}

#[test]
fn test_realtime_stream_with_bbox() {
    let store = populated_store();
    let config = parse_config("[export]\ncompute_bbox = true\nwells_batch_size = 1\n").unwrap();
    let doc = run(&store, &realtime(ExportKind::Wells, None, &config));
    assert_eq!(tags(&doc), vec![100, 101]);
    assert_eq!(doc["bbox"], json!([-124.5, 49.0, -123.0, 49.5]));
}

#[test]
fn test_stream_fragments_from_statement() {
    let store = populated_store();
    let export = realtime(ExportKind::Wells, None, &Config::default());
    let mut stmt = export.prepare(store.connection()).unwrap();
    let fragments: Vec<String> = export
        .stream(&mut stmt)
        .unwrap()
        .map(|f| f.unwrap())
        .collect();

    assert_eq!(fragments.len(), 4);
    assert_eq!(fragments[0], r#"{"type": "FeatureCollection","features": ["#);
    assert!(fragments[1].starts_with("\n{\"type\":\"Feature\""));
    assert!(fragments[2].starts_with(",\n{\"type\":\"Feature\""));
    assert_eq!(fragments[3], "]}");
}

#[test]
fn test_bulk_export_writes_every_file() {
    let store = populated_store();
    let dir = tempfile::tempdir().unwrap();
    // Small windows so the key space is walked in several steps
    let config = parse_config(
        "[export]\nwells_batch_size = 7\nlithology_batch_size = 7\naquifers_batch_size = 2\n",
    )
    .unwrap();

    let summaries =
        write_exports(store.connection(), &ExportKind::ALL, dir.path(), &config).unwrap();
    let counts: Vec<(ExportKind, usize)> = summaries.iter().map(|s| (s.kind, s.features)).collect();
    assert_eq!(
        counts,
        vec![
            (ExportKind::Wells, 2),
            (ExportKind::Lithology, 2),
            (ExportKind::Aquifers, 2)
        ]
    );

    let wells: Value =
        serde_json::from_str(&fs::read_to_string(dir.path().join("wells.json")).unwrap()).unwrap();
    assert_eq!(tags(&wells), vec![100, 101]);

    let aquifers: Value =
        serde_json::from_str(&fs::read_to_string(dir.path().join("aquifers.json")).unwrap())
            .unwrap();
    let ids: Vec<i64> = aquifers["features"]
        .as_array()
        .unwrap()
        .iter()
        .map(|f| f["properties"]["aquifer_id"].as_i64().unwrap())
        .collect();
    assert_eq!(ids, vec![7, 8]);
}

#[test]
fn test_bulk_export_of_empty_store() {
    let store = Store::in_memory().unwrap();
    let dir = tempfile::tempdir().unwrap();
    let summaries =
        write_exports(store.connection(), &ExportKind::ALL, dir.path(), &Config::default())
            .unwrap();

    for summary in summaries {
        assert_eq!(summary.features, 0);
        let text = fs::read_to_string(&summary.path).unwrap();
        assert_eq!(text, r#"{"type": "FeatureCollection","features": []}"#);
    }
}
