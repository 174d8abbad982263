// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Skill registry and router.
//!
//! The registry is collaborator-owned data (`registry.json`); the router
//! only renders human prompts from it. Nothing here mutates state; a skill
//! choice becomes real only through a `TASK_SKILL_SET` event.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::path::Path;

/// What evidence a skill's runs must produce.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvidenceContract {
    #[serde(default = "default_true")]
    pub requires_patch: bool,
    #[serde(default = "default_true")]
    pub requires_commands: bool,
    #[serde(default)]
    pub requires_validation_script: bool,
}

fn default_true() -> bool {
    true
}

/// Risk policy attached to a skill.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RiskPolicy {
    /// `safe` | `networked` | `privileged`
    #[serde(default)]
    pub tier: String,
    #[serde(default)]
    pub allowed_ops: Vec<String>,
    #[serde(default)]
    pub deny_paths: Vec<String>,
    #[serde(default)]
    pub allow_network: bool,
}

/// One skill entry in the registry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SkillSpec {
    pub skill_name: String,
    #[serde(default)]
    pub supported_kinds: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub invocation_hints: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub evidence_contract: Option<EvidenceContract>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub risk_policy: Option<RiskPolicy>,
}

#[derive(Debug, Default, Deserialize)]
struct RegistryFile {
    #[serde(default)]
    skills: Vec<SkillSpec>,
}

/// Loaded skill registry, keyed by skill name.
#[derive(Debug, Default, Clone)]
pub struct SkillRegistry {
    skills: Vec<SkillSpec>,
}

impl SkillRegistry {
    /// Load `registry.json` leniently: missing or malformed yields empty.
    pub fn load(path: &Path) -> Self {
        let skills = std::fs::read_to_string(path)
            .ok()
            .and_then(|raw| serde_json::from_str::<RegistryFile>(&raw).ok())
            .map(|file| {
                file.skills
                    .into_iter()
                    .filter(|s| !s.skill_name.is_empty())
                    .collect()
            })
            .unwrap_or_default();
        Self { skills }
    }

    pub fn by_kind(&self, kind: Option<&str>) -> Vec<&SkillSpec> {
        let Some(kind) = kind else {
            return Vec::new();
        };
        self.skills
            .iter()
            .filter(|s| s.supported_kinds.iter().any(|k| k == kind))
            .collect()
    }

    pub fn get(&self, name: &str) -> Option<&SkillSpec> {
        self.skills.iter().find(|s| s.skill_name == name)
    }
}

/// A rendered suggestion for one task awaiting a skill decision.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SkillSuggestion {
    pub task_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    pub candidates: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preferred: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remembered: Option<String>,
    #[serde(rename = "suggestedByPM")]
    pub suggested_by_pm: Vec<String>,
}

/// Ranks skill candidates for a task: PM suggestions first, then registry
/// matches by kind; the remembered per-kind choice wins as preferred.
pub struct SkillRouter {
    registry: SkillRegistry,
    skill_memory: HashMap<String, String>,
}

impl SkillRouter {
    pub fn new(registry: SkillRegistry, skill_memory: HashMap<String, String>) -> Self {
        Self {
            registry,
            skill_memory,
        }
    }

    /// Build a suggestion from a `taskSpec` payload.
    pub fn suggest(&self, task_spec: &Value) -> SkillSuggestion {
        let task_id = task_spec
            .get("taskId")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        let kind = task_spec
            .get("kind")
            .and_then(Value::as_str)
            .map(str::to_string);
        let suggested_by_pm: Vec<String> = task_spec
            .get("suggestedSkills")
            .and_then(Value::as_array)
            .map(|arr| {
                arr.iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        let mut candidates: Vec<String> = Vec::new();
        for name in &suggested_by_pm {
            if !candidates.contains(name) {
                candidates.push(name.clone());
            }
        }
        for spec in self.registry.by_kind(kind.as_deref()) {
            if !candidates.contains(&spec.skill_name) {
                candidates.push(spec.skill_name.clone());
            }
        }

        let remembered = kind
            .as_deref()
            .and_then(|k| self.skill_memory.get(k))
            .cloned();
        let preferred = task_spec
            .get("preferredSkill")
            .and_then(Value::as_str)
            .map(str::to_string)
            .or_else(|| remembered.clone())
            .or_else(|| candidates.first().cloned());

        SkillSuggestion {
            task_id,
            kind,
            candidates,
            preferred,
            remembered,
            suggested_by_pm,
        }
    }

    /// Human prompt for a suggestion, with the confirmation command inline.
    pub fn build_prompt(&self, project: &str, suggestion: &SkillSuggestion) -> String {
        if let Some(remembered) = &suggestion.remembered {
            let kind = suggestion.kind.as_deref().unwrap_or("this");
            return format!(
                "Last {kind} task used {remembered}. Keep it?\nConfirm: ov {project} skill {} {remembered}",
                suggestion.task_id
            );
        }
        if let Some(preferred) = &suggestion.preferred {
            return format!(
                "Suggested skill: {preferred}.\nConfirm: ov {project} skill {} {preferred}",
                suggestion.task_id
            );
        }
        format!("Pick a skill for task {}.", suggestion.task_id)
    }
}

#[cfg(test)]
#[path = "skills_tests.rs"]
mod tests;
