// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use serde_json::json;

#[test]
fn write_then_read_back() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("derived/sequence.json");
    atomic_write_json(&path, &json!({"lastSequence": 7})).unwrap();

    let raw = std::fs::read_to_string(&path).unwrap();
    let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
    assert_eq!(value["lastSequence"], json!(7));
}

#[test]
fn overwrite_replaces_whole_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("f.json");
    atomic_write_json(&path, &json!({"a": 1, "long": "xxxxxxxxxxxxxxxxxxxx"})).unwrap();
    atomic_write_json(&path, &json!({"a": 2})).unwrap();

    let value: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(value, json!({"a": 2}));
}

#[test]
fn no_tmp_file_left_behind() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("f.json");
    atomic_write_json(&path, &json!({})).unwrap();
    let names: Vec<String> = std::fs::read_dir(dir.path())
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    assert_eq!(names, vec!["f.json".to_string()]);
}

#[test]
fn append_line_adds_newline_per_call() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("audit/events.ndjson");
    append_line(&path, "{\"a\":1}").unwrap();
    append_line(&path, "{\"a\":2}").unwrap();

    let raw = std::fs::read_to_string(&path).unwrap();
    assert_eq!(raw, "{\"a\":1}\n{\"a\":2}\n");
}
