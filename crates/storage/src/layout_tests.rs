// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use std::path::PathBuf;

#[test]
fn paths_are_project_relative() {
    let layout = ProjectLayout::new("/proj");
    assert_eq!(layout.events_path(), PathBuf::from("/proj/audit/events.ndjson"));
    assert_eq!(layout.security_log_path(), PathBuf::from("/proj/audit/security.log"));
    assert_eq!(layout.sequence_path(), PathBuf::from("/proj/derived/sequence.json"));
    assert_eq!(
        layout.idempotency_index_path(),
        PathBuf::from("/proj/derived/idempotency-index.json")
    );
    assert_eq!(
        layout.verdicts_path(),
        PathBuf::from("/proj/derived/watchdog-verdicts.ndjson")
    );
    assert_eq!(layout.locks_index_path(), PathBuf::from("/proj/derived/locks-index.json"));
    assert_eq!(layout.status_path(), PathBuf::from("/proj/status.json"));
    assert_eq!(layout.team_path(), PathBuf::from("/proj/team.json"));
}

#[test]
fn evidence_file_path() {
    let layout = ProjectLayout::new("/proj");
    assert_eq!(
        layout.evidence_file("DOCS-1", "r-1"),
        PathBuf::from("/proj/evidence/DOCS-1/r-1.md")
    );
}

#[test]
fn lock_sidecar_appends_suffix() {
    let path = PathBuf::from("/proj/audit/events.ndjson");
    assert_eq!(
        ProjectLayout::lock_path(&path),
        PathBuf::from("/proj/audit/events.ndjson.lock")
    );
}

#[test]
fn ensure_dirs_creates_audit_and_derived() {
    let dir = tempfile::tempdir().unwrap();
    let layout = ProjectLayout::new(dir.path());
    layout.ensure_dirs().unwrap();
    assert!(layout.audit_dir().is_dir());
    assert!(layout.derived_dir().is_dir());
}
