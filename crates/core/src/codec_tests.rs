// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::event::{Event, EventType};
use proptest::prelude::*;
use serde_json::{json, Value};

fn sample_event() -> Event {
    Event::new(EventType::WorkerRunStarted, "demo")
        .with_actor("orchestrator")
        .with_task("T-1")
        .with_run("r-0192e6a0-0000-7000-8000-000000000001")
        .with_key("demo:T-1:r-1:WORKER_RUN_STARTED")
        .with_field("mode", "async")
}

#[test]
fn canonical_keys_are_sorted() {
    let canonical = canonical_json(&sample_event()).unwrap();
    let value: Value = serde_json::from_str(&canonical).unwrap();
    let keys: Vec<&String> = value.as_object().unwrap().keys().collect();
    let mut sorted = keys.clone();
    sorted.sort();
    assert_eq!(keys, sorted);
}

#[test]
fn canonical_has_no_whitespace_and_empty_crc() {
    let canonical = canonical_json(&sample_event()).unwrap();
    assert!(!canonical.contains(": "));
    assert!(!canonical.contains(", "));
    assert!(canonical.contains("\"crc32\":\"\""));
}

#[test]
fn canonical_preserves_unicode() {
    let event = Event::new(EventType::TaskspecPublished, "demo").with_field("goal", "文档");
    let canonical = canonical_json(&event).unwrap();
    assert!(canonical.contains("文档"), "unicode must not be escaped: {canonical}");
}

#[test]
fn crc_is_eight_upper_hex() {
    let crc = compute_crc32(&sample_event()).unwrap();
    assert_eq!(crc.len(), 8);
    assert!(crc.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_lowercase()));
}

#[test]
fn verify_accepts_computed_value() {
    let mut event = sample_event();
    event.crc32 = Some(compute_crc32(&event).unwrap());
    assert!(verify_crc32(&event));
}

#[test]
fn verify_rejects_missing_or_empty() {
    let mut event = sample_event();
    assert!(!verify_crc32(&event));
    event.crc32 = Some(String::new());
    assert!(!verify_crc32(&event));
}

#[test]
fn verify_rejects_payload_tamper() {
    let mut event = sample_event();
    event.crc32 = Some(compute_crc32(&event).unwrap());
    event.payload.insert("mode".to_string(), json!("sync"));
    assert!(!verify_crc32(&event));
}

#[test]
fn value_verify_matches_typed_verify() {
    let mut event = sample_event();
    event.crc32 = Some(compute_crc32(&event).unwrap());
    let value = serde_json::to_value(&event).unwrap();
    assert!(verify_crc32_value(&value));
}

#[test]
fn value_verify_detects_in_place_flip() {
    let mut event = sample_event();
    event.crc32 = Some(compute_crc32(&event).unwrap());
    let line = serde_json::to_string(&serde_json::to_value(&event).unwrap()).unwrap();
    let tampered = line.replacen("async", "Async", 1);
    let value: Value = serde_json::from_str(&tampered).unwrap();
    assert!(!verify_crc32_value(&value));
}

#[test]
fn non_object_value_fails() {
    assert!(canonical_json_value(&json!([1, 2, 3])).is_err());
    assert!(!verify_crc32_value(&json!("not an object")));
}

proptest! {
    // Determinism: same event, same canonical bytes, same CRC, always.
    #[test]
    fn canonicalization_is_deterministic(
        project in "[a-z][a-z0-9-]{0,12}",
        key in "[a-zA-Z][a-zA-Z0-9_]{0,8}",
        val in ".*",
    ) {
        let event = Event::new(EventType::EvidenceSubmitted, project)
            .with_field(key, val);
        let a = canonical_json(&event).unwrap();
        let b = canonical_json(&event).unwrap();
        prop_assert_eq!(&a, &b);
        prop_assert_eq!(compute_crc32(&event).unwrap(), compute_crc32(&event).unwrap());
    }

    // The stored CRC never depends on the crc32 field's prior contents.
    #[test]
    fn crc_ignores_existing_crc_field(stored in "[0-9A-F]{8}") {
        let mut event = sample_event();
        let before = compute_crc32(&event).unwrap();
        event.crc32 = Some(stored);
        prop_assert_eq!(before, compute_crc32(&event).unwrap());
    }
}
