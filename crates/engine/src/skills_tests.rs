// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use serde_json::json;
use std::collections::HashMap;

fn registry(dir: &tempfile::TempDir) -> SkillRegistry {
    let path = dir.path().join("registry.json");
    std::fs::write(
        &path,
        json!({"skills": [
            {"skillName": "writer", "supportedKinds": ["docs", "comms"]},
            {"skillName": "coder", "supportedKinds": ["coding"]},
            {"skillName": "", "supportedKinds": ["docs"]},
        ]})
        .to_string(),
    )
    .unwrap();
    SkillRegistry::load(&path)
}

#[test]
fn load_skips_nameless_entries() {
    let dir = tempfile::tempdir().unwrap();
    let registry = registry(&dir);
    assert!(registry.get("writer").is_some());
    assert!(registry.get("coder").is_some());
    assert!(registry.get("").is_none());
}

#[test]
fn load_missing_or_malformed_is_empty() {
    let dir = tempfile::tempdir().unwrap();
    let registry = SkillRegistry::load(&dir.path().join("absent.json"));
    assert!(registry.by_kind(Some("docs")).is_empty());

    std::fs::write(dir.path().join("bad.json"), "{oops").unwrap();
    let registry = SkillRegistry::load(&dir.path().join("bad.json"));
    assert!(registry.get("writer").is_none());
}

#[test]
fn by_kind_filters() {
    let dir = tempfile::tempdir().unwrap();
    let registry = registry(&dir);
    let docs: Vec<&str> = registry
        .by_kind(Some("docs"))
        .iter()
        .map(|s| s.skill_name.as_str())
        .collect();
    assert_eq!(docs, vec!["writer"]);
    assert!(registry.by_kind(None).is_empty());
}

#[test]
fn suggest_ranks_pm_suggestions_first() {
    let dir = tempfile::tempdir().unwrap();
    let router = SkillRouter::new(registry(&dir), HashMap::new());
    let suggestion = router.suggest(&json!({
        "taskId": "DOCS-1",
        "kind": "docs",
        "suggestedSkills": ["pandoc", "writer"],
    }));

    assert_eq!(suggestion.candidates, vec!["pandoc", "writer"]);
    assert_eq!(suggestion.preferred.as_deref(), Some("pandoc"));
    assert_eq!(suggestion.remembered, None);
}

#[test]
fn suggest_prefers_remembered_skill() {
    let dir = tempfile::tempdir().unwrap();
    let memory = HashMap::from([("docs".to_string(), "writer".to_string())]);
    let router = SkillRouter::new(registry(&dir), memory);
    let suggestion = router.suggest(&json!({"taskId": "DOCS-1", "kind": "docs"}));

    assert_eq!(suggestion.remembered.as_deref(), Some("writer"));
    assert_eq!(suggestion.preferred.as_deref(), Some("writer"));
}

#[test]
fn suggest_honors_explicit_preference() {
    let dir = tempfile::tempdir().unwrap();
    let memory = HashMap::from([("docs".to_string(), "writer".to_string())]);
    let router = SkillRouter::new(registry(&dir), memory);
    let suggestion = router.suggest(&json!({
        "taskId": "DOCS-1",
        "kind": "docs",
        "preferredSkill": "pandoc",
    }));
    assert_eq!(suggestion.preferred.as_deref(), Some("pandoc"));
}

#[test]
fn prompt_variants() {
    let dir = tempfile::tempdir().unwrap();
    let memory = HashMap::from([("docs".to_string(), "writer".to_string())]);
    let router = SkillRouter::new(registry(&dir), memory);

    let remembered = router.suggest(&json!({"taskId": "D-1", "kind": "docs"}));
    assert!(router.build_prompt("demo", &remembered).contains("Keep it?"));

    let fresh_router = SkillRouter::new(SkillRegistry::default(), HashMap::new());
    let bare = fresh_router.suggest(&json!({"taskId": "D-2"}));
    assert_eq!(
        fresh_router.build_prompt("demo", &bare),
        "Pick a skill for task D-2."
    );
}
