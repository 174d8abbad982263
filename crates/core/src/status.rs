// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Materialized status snapshot published to `status.json`.
//!
//! Status is always derived, a deterministic fold over the event log, and
//! is rewritten atomically on every orchestrator tick.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::id::{RunId, TaskId};

/// Project lifecycle phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Running,
    Finished,
    Halted,
}

/// Operating mode. Degraded means a policy invariant was violated and
/// operator action is recommended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    Normal,
    Degraded,
}

/// Why the project is degraded
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DegradedReason {
    WatchdogUnresponsive,
    VerdictTimeout,
    RecoveryInProgress,
    MultipleOpenRuns,
}

/// Watchdog liveness
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WatchdogState {
    Healthy,
    Unresponsive,
}

/// Task state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskState {
    Pending,
    Assigned,
    Running,
    Done,
    Blocked,
    Canceled,
}

impl TaskState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, TaskState::Done | TaskState::Blocked | TaskState::Canceled)
    }
}

/// A named precondition that must clear before a task can progress.
///
/// Variant order matches the sorted wire form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Gate {
    AwaitingPolicyApproval,
    AwaitingSkillDecision,
    AwaitingVerdict,
    NeedsHumanReview,
}

/// Outcome of an evidence audit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Verdict {
    Pass,
    Warn,
    Block,
}

impl Verdict {
    pub fn as_str(&self) -> &'static str {
        match self {
            Verdict::Pass => "PASS",
            Verdict::Warn => "WARN",
            Verdict::Block => "BLOCK",
        }
    }

    pub fn from_wire(value: &str) -> Option<Self> {
        match value {
            "PASS" => Some(Verdict::Pass),
            "WARN" => Some(Verdict::Warn),
            "BLOCK" => Some(Verdict::Block),
            _ => None,
        }
    }
}

impl std::fmt::Display for Verdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Task completion counts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Progress {
    pub total: usize,
    pub done: usize,
    pub blocked: usize,
}

/// Project-level status
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectStatus {
    pub name: String,
    pub phase: Phase,
    pub halted: bool,
    pub mode: Mode,
    pub degraded_reason: Option<DegradedReason>,
    pub progress: Progress,
}

/// Watchdog-level status
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WatchdogStatus {
    pub last_heartbeat_at: Option<String>,
    pub state: WatchdogState,
}

/// One task row in the published snapshot.
///
/// Done tasks publish the compact summary shape (`taskId`, `resultSummary`,
/// `evidencePath`, `lastRunId`, `taskSpec`); every other state publishes the
/// full row. `state == None` therefore means done.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskStatus {
    pub task_id: TaskId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<TaskState>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub gates: Vec<Gate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub run_id: Option<RunId>,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub skill_decision: Map<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub policy_tier: Option<String>,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub last_evidence: Map<String, Value>,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub last_verdict: Map<String, Value>,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub result: Map<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result_summary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub evidence_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_run_id: Option<RunId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_spec: Option<Value>,
}

impl TaskStatus {
    /// Done rows carry no `state`, only the last run they completed under.
    pub fn is_done(&self) -> bool {
        self.state.is_none() && self.last_run_id.is_some()
    }

    pub fn is_blocked(&self) -> bool {
        self.state == Some(TaskState::Blocked)
    }

    /// The run the task is currently (or was last) bound to.
    pub fn effective_run_id(&self) -> Option<&RunId> {
        self.run_id.as_ref().or(self.last_run_id.as_ref())
    }
}

/// An entry in `risks[]`: a diagnostic event worth operator attention.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Risk {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_id: Option<String>,
    #[serde(default)]
    pub payload: Map<String, Value>,
}

/// An entry in `alerts[]`. Shapes vary per alert kind; absent fields are
/// omitted on the wire.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Alert {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_id: Option<TaskId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub run_id: Option<RunId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub run_ids: Option<Vec<RunId>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hash: Option<String>,
}

/// Lock phase for the whole project
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LockPhase {
    Idle,
    Running,
}

/// Derived lock view: project phase plus the open run per task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocksStatus {
    pub project: LockPhase,
    pub tasks: IndexMap<TaskId, RunId>,
}

impl Default for LocksStatus {
    fn default() -> Self {
        Self {
            project: LockPhase::Idle,
            tasks: IndexMap::new(),
        }
    }
}

/// The published snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Status {
    pub project: ProjectStatus,
    pub watchdog: WatchdogStatus,
    pub tasks: Vec<TaskStatus>,
    pub risks: Vec<Risk>,
    pub alerts: Vec<Alert>,
    pub locks: LocksStatus,
    pub updated_at: String,
}

impl Status {
    /// Baseline status before any event is folded in.
    pub fn base(project_name: impl Into<String>, updated_at: String) -> Self {
        Self {
            project: ProjectStatus {
                name: project_name.into(),
                phase: Phase::Running,
                halted: false,
                mode: Mode::Normal,
                degraded_reason: None,
                progress: Progress::default(),
            },
            watchdog: WatchdogStatus {
                last_heartbeat_at: None,
                state: WatchdogState::Healthy,
            },
            tasks: Vec::new(),
            risks: Vec::new(),
            alerts: Vec::new(),
            locks: LocksStatus::default(),
            updated_at,
        }
    }

    pub fn task(&self, task_id: &str) -> Option<&TaskStatus> {
        self.tasks.iter().find(|t| t.task_id.as_str() == task_id)
    }
}

#[cfg(test)]
#[path = "status_tests.rs"]
mod tests;
