// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Task specification published by the PM.

use serde::{Deserialize, Serialize};

use crate::id::TaskId;

/// What kind of work a task is. Drives skill routing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskKind {
    Coding,
    BuildTest,
    Docs,
    Research,
    Ops,
    Design,
    Comms,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

/// A task specification as carried in `TASKSPEC_PUBLISHED` payloads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskSpec {
    pub task_id: TaskId,
    pub goal: String,
    pub kind: TaskKind,
    #[serde(default)]
    pub acceptance: Vec<String>,
    #[serde(default)]
    pub dependencies: Vec<String>,
    #[serde(default)]
    pub context_files: Vec<String>,
    #[serde(default)]
    pub suggested_skills: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preferred_skill: Option<String>,
    #[serde(default)]
    pub fallback_skills: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub risk_level: Option<RiskLevel>,
}
