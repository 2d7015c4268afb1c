//! Command-line tests for the `gwells-export` binary.

use assert_cmd::Command;
use gwells_export::storage::{NewWell, Store};
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn gwells_export(config: &Path) -> Command {
    let mut cmd = Command::cargo_bin("gwells-export").unwrap();
    cmd.arg("--config").arg(config);
    cmd
}

struct Workspace {
    dir: TempDir,
}

impl Workspace {
    fn new(config: &str) -> Self {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("config.toml"), config).unwrap();
        Workspace { dir }
    }

    fn config(&self) -> std::path::PathBuf {
        self.dir.path().join("config.toml")
    }

    fn database(&self) -> std::path::PathBuf {
        self.dir.path().join("gwells.sqlite3")
    }
}

#[test]
fn test_init_then_export_empty_database() {
    let ws = Workspace::new("");
    gwells_export(&ws.config())
        .arg("init")
        .arg(ws.database())
        .assert()
        .success();

    let out_dir = ws.dir.path().join("out");
    fs::create_dir(&out_dir).unwrap();
    let assert = gwells_export(&ws.config())
        .arg("export")
        .arg(ws.database())
        .arg("--output-dir")
        .arg(&out_dir)
        .assert()
        .success();

    let stdout = String::from_utf8(assert.get_output().stdout.clone()).unwrap();
    assert_eq!(stdout.lines().count(), 3);
    for name in ["wells.json", "lithology.json", "aquifers.json"] {
        let text = fs::read_to_string(out_dir.join(name)).unwrap();
        assert_eq!(text, r#"{"type": "FeatureCollection","features": []}"#);
    }
}

#[test]
fn test_export_only_selected_kind() {
    let ws = Workspace::new("");
    Store::open(ws.database()).unwrap();

    gwells_export(&ws.config())
        .arg("export")
        .arg(ws.database())
        .arg("--output-dir")
        .arg(ws.dir.path())
        .arg("--only")
        .arg("aquifers")
        .assert()
        .success();

    assert!(ws.dir.path().join("aquifers.json").exists());
    assert!(!ws.dir.path().join("wells.json").exists());
}

#[test]
fn test_stream_wells_within_bounds() {
    let ws = Workspace::new("");
    {
        let store = Store::open(ws.database()).unwrap();
        for (tag, lon, lat) in [(1, -124.5, 49.0), (2, -120.0, 50.0)] {
            store
                .add_well(&NewWell {
                    well_tag_number: tag,
                    longitude: Some(lon),
                    latitude: Some(lat),
                    ..NewWell::default()
                })
                .unwrap();
        }
    }

    let assert = gwells_export(&ws.config())
        .arg("stream")
        .arg("wells")
        .arg(ws.database())
        .args(["--sw-long", "-125", "--sw-lat", "49", "--ne-long", "-124", "--ne-lat", "49"])
        .assert()
        .success();

    let doc: serde_json::Value = serde_json::from_slice(&assert.get_output().stdout).unwrap();
    let features = doc["features"].as_array().unwrap();
    assert_eq!(features.len(), 1);
    assert_eq!(features[0]["properties"]["well_tag_number"], 1);
}

#[test]
fn test_stream_redirect_prints_static_location() {
    let ws = Workspace::new("[static_files]\nhost = \"s3.example.com\"\nbucket = \"gwells\"\n");
    let assert = gwells_export(&ws.config())
        .args(["stream", "lithology", "--redirect"])
        .assert()
        .success();
    let stdout = String::from_utf8(assert.get_output().stdout.clone()).unwrap();
    assert_eq!(
        stdout.trim(),
        "https://s3.example.com/gwells/api/v1/gis/lithology.json"
    );
}

#[test]
fn test_redirect_without_static_files_fails() {
    let ws = Workspace::new("");
    gwells_export(&ws.config())
        .args(["stream", "wells", "--redirect"])
        .assert()
        .failure();
}

#[test]
fn test_export_without_database_fails() {
    let ws = Workspace::new("");
    gwells_export(&ws.config()).arg("export").assert().failure();
}

#[test]
fn test_invalid_config_fails() {
    let ws = Workspace::new("[export]\nwells_batch_size = 0\n");
    gwells_export(&ws.config())
        .arg("init")
        .arg(ws.database())
        .assert()
        .failure();
}
