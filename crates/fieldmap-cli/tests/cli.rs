use std::fs;
use std::path::{Path, PathBuf};

use assert_cmd::Command;
use pretty_assertions::assert_eq;
use predicates::prelude::*;
use tempfile::TempDir;

const FRAGMENTS: &str = r#"[
    {"id": "lbl", "text": "Invoice Number", "page": 1,
     "polygon": [{"x": 10, "y": 10}, {"x": 110, "y": 10}, {"x": 110, "y": 30}, {"x": 10, "y": 30}]},
    {"id": "val", "text": "INV-123", "page": 1,
     "polygon": [{"x": 120, "y": 10}, {"x": 180, "y": 10}, {"x": 180, "y": 30}, {"x": 120, "y": 30}]}
]"#;

const LAYOUT: &str = r#"{
    "name": "acme",
    "fields": [
        {"id": "document_number", "rules": [
            {"type": "anchor", "id": "number",
             "anchor": {"aliases": ["Invoice Number"]},
             "position": {"starting_position": "top_right",
                          "offset_rect": {"top": 0, "left": 0, "width": 200, "height": 20}}}
        ]},
        {"id": "due_date", "rules": [
            {"type": "anchor", "id": "due", "anchor": {"aliases": ["Due Date"]}}
        ]}
    ]
}"#;

fn fieldmap() -> Command {
    Command::cargo_bin("fieldmap").unwrap()
}

fn write(dir: &Path, name: &str, content: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, content).unwrap();
    path
}

#[test]
fn extract_prints_json_outcome() {
    let dir = TempDir::new().unwrap();
    let fragments = write(dir.path(), "fragments.json", FRAGMENTS);
    let layout = write(dir.path(), "layout.json", LAYOUT);

    let output = fieldmap()
        .arg("extract")
        .arg(&fragments)
        .arg("--layout")
        .arg(&layout)
        .output()
        .unwrap();
    assert!(output.status.success());

    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["extractions"][0]["field_id"], "document_number");
    assert_eq!(json["extractions"][0]["value"], "INV-123");
    assert_eq!(json["extractions"][0]["segments"][0]["source_fragment_ids"][0], "val");
    assert_eq!(json["matched_rule_ids"], serde_json::json!(["number"]));
    assert_eq!(json["unmatched_field_ids"], serde_json::json!(["due_date"]));
}

#[test]
fn extract_accepts_wrapped_fragments_and_csv() {
    let dir = TempDir::new().unwrap();
    let wrapped = format!(r#"{{"fragments": {}}}"#, FRAGMENTS);
    let fragments = write(dir.path(), "fragments.json", &wrapped);
    let layout = write(dir.path(), "layout.json", LAYOUT);

    fieldmap()
        .arg("extract")
        .arg(&fragments)
        .args(["--layout", layout.to_str().unwrap(), "--format", "csv"])
        .assert()
        .success()
        .stdout(predicate::str::contains("document_number,INV-123,number,val"));
}

#[test]
fn extract_missing_input_fails() {
    let dir = TempDir::new().unwrap();
    let layout = write(dir.path(), "layout.json", LAYOUT);

    fieldmap()
        .arg("extract")
        .arg(dir.path().join("nope.json"))
        .arg("--layout")
        .arg(&layout)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Fragment file not found"));
}

#[test]
fn replay_applies_script_after_seeding() {
    let dir = TempDir::new().unwrap();
    let fragments = write(dir.path(), "fragments.json", FRAGMENTS);
    let layout = write(dir.path(), "layout.json", LAYOUT);
    let script = write(
        dir.path(),
        "script.json",
        r#"[
            {"action": "add_line"},
            {"action": "link_fragments", "key": "line_items.1.sku", "source_ids": ["val"]},
            {"action": "remove_line", "line_number": 1},
            {"action": "undo"}
        ]"#,
    );

    let output = fieldmap()
        .arg("replay")
        .arg(&fragments)
        .arg("--script")
        .arg(&script)
        .arg("--layout")
        .arg(&layout)
        .output()
        .unwrap();
    assert!(output.status.success());

    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["structured_document"]["header"]["document_number"], "INV-123");
    assert_eq!(json["structured_document"]["line_items"][0]["line_number"], 1);
    assert_eq!(
        json["field_mapping_table"]["line_items.1.sku"]["source_ids"],
        serde_json::json!(["val"])
    );
    assert_eq!(
        json["field_mapping_table"]["document_number"]["cached_geometry"][0]["left"],
        120.0
    );
    assert_eq!(json["undo_depth"], 3);
    assert_eq!(json["redo_depth"], 1);
    assert_eq!(json["actions_applied"], 4);
    assert_eq!(json["actions_changed"], 4);
}

#[test]
fn replay_rejects_bad_script() {
    let dir = TempDir::new().unwrap();
    let fragments = write(dir.path(), "fragments.json", FRAGMENTS);
    let script = write(dir.path(), "script.json", r#"[{"action": "explode"}]"#);

    fieldmap()
        .arg("replay")
        .arg(&fragments)
        .arg("--script")
        .arg(&script)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid script"));
}

#[test]
fn batch_writes_outputs_and_summary() {
    let dir = TempDir::new().unwrap();
    let inputs = dir.path().join("inputs");
    fs::create_dir_all(&inputs).unwrap();
    write(&inputs, "a.json", FRAGMENTS);
    write(&inputs, "b.json", FRAGMENTS);
    write(&inputs, "broken.json", "not json");
    let layout = write(dir.path(), "layout.json", LAYOUT);
    let out = dir.path().join("out");

    fieldmap()
        .arg("batch")
        .arg(format!("{}/*.json", inputs.display()))
        .arg("--layout")
        .arg(&layout)
        .arg("--output-dir")
        .arg(&out)
        .args(["--summary", "--continue-on-error", "-j", "2"])
        .assert()
        .success()
        .stdout(predicate::str::contains("2 successful"));

    assert!(out.join("a.json").exists());
    assert!(out.join("b.json").exists());
    assert!(!out.join("broken.json").exists());

    let summary = fs::read_to_string(out.join("summary.csv")).unwrap();
    assert!(summary.starts_with("filename,status,"));
    assert!(summary.contains("a.json,success,1,1,0,"));
    assert!(summary.contains("broken.json,error,"));
}

#[test]
fn batch_stops_on_first_error_by_default() {
    let dir = TempDir::new().unwrap();
    let inputs = dir.path().join("inputs");
    fs::create_dir_all(&inputs).unwrap();
    write(&inputs, "broken.json", "{}");
    let layout = write(dir.path(), "layout.json", LAYOUT);

    fieldmap()
        .arg("batch")
        .arg(format!("{}/*.json", inputs.display()))
        .arg("--layout")
        .arg(&layout)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Processing failed"));
}

#[test]
fn config_init_set_get_with_explicit_path() {
    let dir = TempDir::new().unwrap();
    let config = dir.path().join("nested").join("config.json");
    let config = config.to_str().unwrap();

    fieldmap()
        .args(["-c", config, "config", "init"])
        .assert()
        .success();

    fieldmap()
        .args(["-c", config, "config", "set", "store.history_limit", "25"])
        .assert()
        .success();

    fieldmap()
        .args(["-c", config, "config", "get", "store.history_limit"])
        .assert()
        .success()
        .stdout(predicate::str::diff("25\n"));

    fieldmap()
        .args(["-c", config, "config", "set", "store.nope", "1"])
        .assert()
        .failure();
}
