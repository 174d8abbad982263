// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Project metadata loaded from `team.json`.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

/// Per-team defaults, including the remembered skill per task kind.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamDefaults {
    #[serde(default)]
    pub skill_memory: HashMap<String, String>,
}

/// Project metadata: name, repo path, and actor session labels.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Team {
    #[serde(default)]
    pub project: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plan_path: Option<String>,
    #[serde(default)]
    pub labels: HashMap<String, String>,
    #[serde(default)]
    pub defaults: TeamDefaults,
}

impl Team {
    /// Load `team.json` leniently: a missing or unreadable file yields the
    /// default (the project name then falls back to `unknown` downstream).
    pub fn load(path: &Path) -> Self {
        std::fs::read_to_string(path)
            .ok()
            .and_then(|raw| serde_json::from_str(&raw).ok())
            .unwrap_or_default()
    }

    /// Session label for an actor role (e.g. `orchestrator`).
    pub fn label(&self, role: &str) -> Option<&str> {
        self.labels.get(role).map(String::as_str)
    }
}
