// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Event envelope and the closed event-type set.
//!
//! Every durable fact in the system is one of these records, appended to
//! `audit/events.ndjson` as a single canonical JSON line. The envelope is
//! fixed; per-type data rides in the schema-less `payload` map.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::id::{RunId, TaskId};

/// The closed set of event types.
///
/// Serialized in SCREAMING_SNAKE_CASE on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventType {
    // -- lifecycle --
    TeamCreated,
    ProjectStarted,
    ProjectFinished,
    ProjectHalted,
    ProjectResumed,
    ProjectModeRestored,

    // -- task flow --
    TaskspecPublished,
    TaskSkillSet,
    PolicyTierRequested,
    PolicyTierApproved,

    // -- run flow --
    WorkerRunIntent,
    WorkerRunStarted,
    WorkerRunCompleted,
    WorkerRunFailed,
    WorkerRunAborted,
    RunClosed,

    // -- verdict --
    EvidenceSubmitted,
    WatchdogVerdict,
    WatchdogHeartbeat,
    HumanVerdict,

    // -- diagnostics --
    MessageIgnored,
    WatchdogUnresponsive,
    VerdictTimeout,
    LockTimeoutDetected,
    CorruptedLineDetected,
    RecoveryStarted,
    TaskRetried,
    ResultNotified,
}

impl EventType {
    /// Wire name of the event type.
    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::TeamCreated => "TEAM_CREATED",
            EventType::ProjectStarted => "PROJECT_STARTED",
            EventType::ProjectFinished => "PROJECT_FINISHED",
            EventType::ProjectHalted => "PROJECT_HALTED",
            EventType::ProjectResumed => "PROJECT_RESUMED",
            EventType::ProjectModeRestored => "PROJECT_MODE_RESTORED",
            EventType::TaskspecPublished => "TASKSPEC_PUBLISHED",
            EventType::TaskSkillSet => "TASK_SKILL_SET",
            EventType::PolicyTierRequested => "POLICY_TIER_REQUESTED",
            EventType::PolicyTierApproved => "POLICY_TIER_APPROVED",
            EventType::WorkerRunIntent => "WORKER_RUN_INTENT",
            EventType::WorkerRunStarted => "WORKER_RUN_STARTED",
            EventType::WorkerRunCompleted => "WORKER_RUN_COMPLETED",
            EventType::WorkerRunFailed => "WORKER_RUN_FAILED",
            EventType::WorkerRunAborted => "WORKER_RUN_ABORTED",
            EventType::RunClosed => "RUN_CLOSED",
            EventType::EvidenceSubmitted => "EVIDENCE_SUBMITTED",
            EventType::WatchdogVerdict => "WATCHDOG_VERDICT",
            EventType::WatchdogHeartbeat => "WATCHDOG_HEARTBEAT",
            EventType::HumanVerdict => "HUMAN_VERDICT",
            EventType::MessageIgnored => "MESSAGE_IGNORED",
            EventType::WatchdogUnresponsive => "WATCHDOG_UNRESPONSIVE",
            EventType::VerdictTimeout => "VERDICT_TIMEOUT",
            EventType::LockTimeoutDetected => "LOCK_TIMEOUT_DETECTED",
            EventType::CorruptedLineDetected => "CORRUPTED_LINE_DETECTED",
            EventType::RecoveryStarted => "RECOVERY_STARTED",
            EventType::TaskRetried => "TASK_RETRIED",
            EventType::ResultNotified => "RESULT_NOTIFIED",
        }
    }

    /// Run-bound types: once a task has a different run bound, these are
    /// ignored by the fold (protects against stray cross-run messages).
    pub fn is_run_bound(&self) -> bool {
        matches!(
            self,
            EventType::WorkerRunStarted
                | EventType::WorkerRunCompleted
                | EventType::WorkerRunFailed
                | EventType::WorkerRunAborted
                | EventType::EvidenceSubmitted
                | EventType::WatchdogVerdict
                | EventType::HumanVerdict
        )
    }
}

impl std::fmt::Display for EventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

fn default_schema_version() -> u32 {
    1
}

/// An immutable event record.
///
/// Fields left `None` by the producer (`eventId`, `sequenceNumber`, `at`) are
/// filled by the state manager at append time. `crc32` is computed over the
/// canonical encoding just before the line hits disk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    #[serde(rename = "type")]
    pub kind: EventType,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sequence_number: Option<u64>,

    #[serde(default = "default_schema_version")]
    pub schema_version: u32,

    /// UTC timestamp, ISO-8601 with microsecond precision and `Z` suffix.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub at: Option<String>,

    /// Producer of the event: `orchestrator`, `pm`, `worker`, `watchdog`, `human`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actor: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_label: Option<String>,

    pub project: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_id: Option<TaskId>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub run_id: Option<RunId>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub correlation_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub causation_id: Option<String>,

    #[serde(default)]
    pub payload: Map<String, Value>,

    /// Caller-supplied deduplication tag. Mandatory at append time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub idempotency_key: Option<String>,

    /// Uppercase 8-hex-digit CRC-32 of the canonical encoding.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub crc32: Option<String>,
}

impl Event {
    /// New event of the given type scoped to a project.
    pub fn new(kind: EventType, project: impl Into<String>) -> Self {
        Self {
            kind,
            event_id: None,
            sequence_number: None,
            schema_version: default_schema_version(),
            at: None,
            actor: None,
            session_label: None,
            project: project.into(),
            task_id: None,
            run_id: None,
            correlation_id: None,
            causation_id: None,
            payload: Map::new(),
            idempotency_key: None,
            crc32: None,
        }
    }

    pub fn with_actor(mut self, actor: impl Into<String>) -> Self {
        self.actor = Some(actor.into());
        self
    }

    pub fn with_task(mut self, task_id: impl Into<TaskId>) -> Self {
        self.task_id = Some(task_id.into());
        self
    }

    /// Binds the run and mirrors it into `correlationId`, the lineage key the
    /// orchestrator uses for every run-scoped event.
    pub fn with_run(mut self, run_id: impl Into<RunId>) -> Self {
        let run = run_id.into();
        self.correlation_id = Some(run.to_string());
        self.run_id = Some(run);
        self
    }

    pub fn with_causation(mut self, causation_id: impl Into<String>) -> Self {
        self.causation_id = Some(causation_id.into());
        self
    }

    pub fn with_key(mut self, idempotency_key: impl Into<String>) -> Self {
        self.idempotency_key = Some(idempotency_key.into());
        self
    }

    pub fn with_session_label(mut self, label: impl Into<String>) -> Self {
        self.session_label = Some(label.into());
        self
    }

    pub fn with_payload(mut self, payload: Map<String, Value>) -> Self {
        self.payload = payload;
        self
    }

    /// Insert one payload entry.
    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.payload.insert(key.into(), value.into());
        self
    }

    /// String payload field, if present and a string.
    pub fn payload_str(&self, key: &str) -> Option<&str> {
        self.payload.get(key).and_then(Value::as_str)
    }
}

#[cfg(test)]
#[path = "event_tests.rs"]
mod tests;
