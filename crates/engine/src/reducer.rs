// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Pure fold over the event log into a [`Status`] snapshot.
//!
//! The reducer never writes events. It reads a snapshot of
//! `audit/events.ndjson`, excludes corrupted lines, sorts by
//! `(sequenceNumber, eventId)`, deduplicates on `idempotencyKey`, and folds
//! the survivors in one strict sequential pass. Running it twice over the
//! same log yields byte-identical status.

use indexmap::IndexMap;
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};
use std::collections::{BTreeSet, HashSet};
use std::io::{self, BufRead, BufReader};
use std::path::Path;
use thiserror::Error;
use tracing::debug;

use ov_core::{
    codec, format_utc, Alert, Clock, DegradedReason, Event, EventType, Gate, LockPhase, Mode,
    Phase, Progress, Risk, RunId, Status, TaskId, TaskState, TaskStatus, Verdict, WatchdogState,
};
use ov_storage::{atomic_write_json, ProjectLayout};

/// Errors from reduce operations.
///
/// Corrupted log lines are not errors; they are data, reported in
/// [`ReplayResult::corrupted`].
#[derive(Debug, Error)]
pub enum ReduceError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

/// A log line excluded from the fold.
#[derive(Debug, Clone, PartialEq)]
pub struct CorruptedLine {
    /// 1-based line number in `events.ndjson`.
    pub line: u64,
    pub reason: String,
    pub raw: String,
}

/// Output of one replay.
#[derive(Debug, Clone)]
pub struct ReplayResult {
    pub status: Status,
    pub corrupted: Vec<CorruptedLine>,
    pub alerts: Vec<Alert>,
}

/// Read and verify the event log.
///
/// Lines that fail JSON decoding or CRC verification become corrupted
/// descriptors and are excluded from the returned events.
pub fn read_events(path: &Path) -> (Vec<Event>, Vec<CorruptedLine>) {
    let mut events = Vec::new();
    let mut corrupted = Vec::new();

    let Ok(file) = std::fs::File::open(path) else {
        return (events, corrupted);
    };

    for (idx, line) in BufReader::new(file).lines().enumerate() {
        let line_no = idx as u64 + 1;
        let raw = match line {
            Ok(l) => l,
            Err(e) => {
                corrupted.push(CorruptedLine {
                    line: line_no,
                    reason: format!("read_error: {e}"),
                    raw: String::new(),
                });
                continue;
            }
        };
        let raw = raw.trim();
        if raw.is_empty() {
            continue;
        }

        let value: Value = match serde_json::from_str(raw) {
            Ok(v) => v,
            Err(e) => {
                corrupted.push(CorruptedLine {
                    line: line_no,
                    reason: format!("json_decode_error: {e}"),
                    raw: raw.to_string(),
                });
                continue;
            }
        };
        if !codec::verify_crc32_value(&value) {
            corrupted.push(CorruptedLine {
                line: line_no,
                reason: "crc_mismatch".to_string(),
                raw: raw.to_string(),
            });
            continue;
        }
        match serde_json::from_value::<Event>(value) {
            Ok(event) => events.push(event),
            Err(e) => corrupted.push(CorruptedLine {
                line: line_no,
                reason: format!("json_decode_error: {e}"),
                raw: raw.to_string(),
            }),
        }
    }

    (events, corrupted)
}

/// Stable sort by `(sequenceNumber, eventId)`, missing values first.
pub fn sort_events(events: &mut [Event]) {
    events.sort_by(|a, b| {
        let ka = (a.sequence_number.unwrap_or(0), a.event_id.as_deref().unwrap_or(""));
        let kb = (b.sequence_number.unwrap_or(0), b.event_id.as_deref().unwrap_or(""));
        ka.cmp(&kb)
    });
}

#[derive(Debug, Clone, Default)]
struct RunFlags {
    started: bool,
    completed: bool,
    failed: bool,
    aborted: bool,
    verdict: Option<Verdict>,
}

#[derive(Debug)]
struct TaskAccum {
    task_id: TaskId,
    state: TaskState,
    gates: BTreeSet<Gate>,
    run_id: Option<RunId>,
    run_flags: RunFlags,
    skill_decision: Map<String, Value>,
    policy_tier: Option<String>,
    last_evidence: Map<String, Value>,
    last_verdict: Map<String, Value>,
    result: Map<String, Value>,
    task_spec: Option<Value>,
}

impl TaskAccum {
    fn new(task_id: TaskId) -> Self {
        Self {
            task_id,
            state: TaskState::Pending,
            gates: BTreeSet::new(),
            run_id: None,
            run_flags: RunFlags::default(),
            skill_decision: Map::new(),
            policy_tier: None,
            last_evidence: Map::new(),
            last_verdict: Map::new(),
            result: Map::new(),
            task_spec: None,
        }
    }

    /// Priority: blocked > canceled > done. Terminal states clear all gates.
    fn recompute_state(&mut self) {
        if self.run_flags.verdict == Some(Verdict::Block) || self.run_flags.failed {
            self.state = TaskState::Blocked;
            self.gates.clear();
            return;
        }
        if self.run_flags.aborted {
            self.state = TaskState::Canceled;
            self.gates.clear();
            return;
        }
        if self.run_flags.completed && self.run_flags.verdict == Some(Verdict::Pass) {
            self.state = TaskState::Done;
            // quality stays warn_override when a human already overrode
            self.result
                .entry("quality".to_string())
                .or_insert(Value::String("clean".to_string()));
            self.gates.clear();
        }
    }
}

/// Replay one project's event log into a status snapshot.
///
/// When `emit_derived` is set, also rewrites
/// `derived/watchdog-verdicts.ndjson` and `derived/locks-index.json`.
pub fn reduce<C: Clock>(
    layout: &ProjectLayout,
    clock: &C,
    emit_derived: bool,
) -> Result<ReplayResult, ReduceError> {
    let (mut events, corrupted) = read_events(&layout.events_path());
    sort_events(&mut events);

    let now = format_utc(clock.now_utc());
    let mut status = Status::base("unknown", now.clone());
    let mut tasks: IndexMap<TaskId, TaskAccum> = IndexMap::new();
    let mut open_runs: IndexMap<TaskId, Vec<RunId>> = IndexMap::new();
    let mut project_running = false;
    let mut seen_keys: HashSet<String> = HashSet::new();

    for event in &events {
        if let Some(key) = &event.idempotency_key {
            if !seen_keys.insert(key.clone()) {
                continue;
            }
        }

        if !event.project.is_empty() {
            status.project.name = event.project.clone();
        }
        let kind = event.kind;
        let payload = &event.payload;

        match kind {
            EventType::ProjectStarted => {
                project_running = true;
                status.project.phase = Phase::Running;
            }
            EventType::ProjectFinished => {
                project_running = false;
                status.project.phase = Phase::Finished;
                status.project.halted = false;
            }
            EventType::ProjectHalted => {
                project_running = false;
                status.project.phase = Phase::Halted;
                status.project.halted = true;
            }
            EventType::ProjectResumed => {
                project_running = true;
                status.project.phase = Phase::Running;
                status.project.halted = false;
            }
            EventType::ProjectModeRestored => {
                status.project.mode = Mode::Normal;
                status.project.degraded_reason = None;
            }
            EventType::WatchdogUnresponsive => {
                status.project.mode = Mode::Degraded;
                status.project.degraded_reason = Some(DegradedReason::WatchdogUnresponsive);
                status.watchdog.state = WatchdogState::Unresponsive;
            }
            EventType::VerdictTimeout => {
                status.project.mode = Mode::Degraded;
                status.project.degraded_reason = Some(DegradedReason::VerdictTimeout);
            }
            EventType::RecoveryStarted => {
                status.project.mode = Mode::Degraded;
                status.project.degraded_reason = Some(DegradedReason::RecoveryInProgress);
            }
            EventType::WatchdogHeartbeat => {
                status.watchdog.last_heartbeat_at = event.at.clone();
                status.watchdog.state = WatchdogState::Healthy;
            }
            _ => {}
        }

        if matches!(
            kind,
            EventType::MessageIgnored
                | EventType::WatchdogUnresponsive
                | EventType::VerdictTimeout
                | EventType::LockTimeoutDetected
                | EventType::CorruptedLineDetected
        ) {
            status.risks.push(Risk {
                kind: kind.as_str().to_string(),
                event_id: event.event_id.clone(),
                payload: payload.clone(),
            });
        }

        let Some(task_id) = event.task_id.clone() else {
            continue;
        };

        let task = tasks
            .entry(task_id.clone())
            .or_insert_with(|| TaskAccum::new(task_id.clone()));

        // Stray cross-run message: the task is bound to a different run.
        if kind.is_run_bound() {
            if let (Some(bound), Some(incoming)) = (&task.run_id, &event.run_id) {
                if bound != incoming {
                    debug!(task = %task_id, bound = %bound, incoming = %incoming,
                        "ignoring event bound to a different run");
                    continue;
                }
            }
        }

        match kind {
            EventType::TaskspecPublished => {
                let specs = payload.get("tasks").and_then(Value::as_array);
                match specs {
                    Some(specs) if !specs.is_empty() => {
                        for spec in specs {
                            let tid = spec
                                .get("taskId")
                                .and_then(Value::as_str)
                                .map(TaskId::from)
                                .unwrap_or_else(|| task_id.clone());
                            let t = tasks
                                .entry(tid.clone())
                                .or_insert_with(|| TaskAccum::new(tid));
                            t.state = TaskState::Pending;
                            t.gates.insert(Gate::AwaitingSkillDecision);
                            t.task_spec = Some(spec.clone());
                        }
                    }
                    _ => {
                        let task = tasks
                            .entry(task_id.clone())
                            .or_insert_with(|| TaskAccum::new(task_id.clone()));
                        task.state = TaskState::Pending;
                        task.gates.insert(Gate::AwaitingSkillDecision);
                        task.task_spec = Some(Value::Object(payload.clone()));
                    }
                }
            }
            EventType::TaskSkillSet => {
                task.gates.remove(&Gate::AwaitingSkillDecision);
                let mut decision = Map::new();
                decision.insert(
                    "chosenSkill".to_string(),
                    payload.get("chosenSkill").cloned().unwrap_or(Value::Null),
                );
                decision.insert(
                    "decisionSeq".to_string(),
                    payload.get("decisionSeq").cloned().unwrap_or(Value::Null),
                );
                task.skill_decision = decision;
            }
            EventType::PolicyTierRequested => {
                task.gates.insert(Gate::AwaitingPolicyApproval);
            }
            EventType::PolicyTierApproved => {
                task.gates.remove(&Gate::AwaitingPolicyApproval);
                task.policy_tier = event.payload_str("tier").map(str::to_string);
            }
            EventType::VerdictTimeout => {
                task.gates.insert(Gate::NeedsHumanReview);
            }
            EventType::WorkerRunIntent => {
                if task.run_id != event.run_id {
                    task.run_flags = RunFlags::default();
                    task.last_evidence = Map::new();
                    task.last_verdict = Map::new();
                    task.result = Map::new();
                }
                task.state = TaskState::Assigned;
                task.run_id = event.run_id.clone();
                if let Some(run) = &event.run_id {
                    let runs = open_runs.entry(task_id.clone()).or_default();
                    if !runs.contains(run) {
                        runs.push(run.clone());
                    }
                }
            }
            EventType::WorkerRunStarted => {
                task.state = TaskState::Running;
                task.run_id = event.run_id.clone();
                task.run_flags.started = true;
            }
            EventType::WorkerRunCompleted => {
                task.run_flags.completed = true;
                task.run_id = event.run_id.clone();
                task.recompute_state();
            }
            EventType::WorkerRunFailed => {
                task.run_flags.failed = true;
                task.run_id = event.run_id.clone();
                let reason = event
                    .payload_str("reason")
                    .or_else(|| event.payload_str("error"))
                    .or_else(|| event.payload_str("message"));
                if let Some(reason) = reason {
                    task.result
                        .entry("failureReason".to_string())
                        .or_insert(Value::String(reason.to_string()));
                }
                task.recompute_state();
            }
            EventType::WorkerRunAborted => {
                task.run_flags.aborted = true;
                task.run_id = event.run_id.clone();
                task.recompute_state();
            }
            EventType::EvidenceSubmitted => {
                task.gates.insert(Gate::AwaitingVerdict);
                task.last_evidence = payload.clone();
            }
            EventType::WatchdogVerdict => {
                let verdict = event.payload_str("verdict").and_then(Verdict::from_wire);
                task.run_flags.verdict = verdict;
                task.last_verdict = payload.clone();
                task.gates.remove(&Gate::AwaitingVerdict);
                match verdict {
                    Some(Verdict::Warn) => {
                        task.gates.insert(Gate::NeedsHumanReview);
                    }
                    Some(Verdict::Block) => {
                        task.state = TaskState::Blocked;
                        task.gates.clear();
                        status.alerts.push(Alert {
                            kind: "blocked".to_string(),
                            task_id: Some(task_id.clone()),
                            run_id: event.run_id.clone(),
                            ..Alert::default()
                        });
                    }
                    _ => {}
                }
                task.recompute_state();
            }
            EventType::HumanVerdict => {
                let verdict = event.payload_str("verdict").and_then(Verdict::from_wire);
                task.run_flags.verdict = verdict;
                task.last_verdict = payload.clone();
                match verdict {
                    Some(Verdict::Pass) => {
                        task.gates.remove(&Gate::NeedsHumanReview);
                        task.result
                            .entry("quality".to_string())
                            .or_insert(Value::String("warn_override".to_string()));
                    }
                    Some(Verdict::Block) => {
                        task.state = TaskState::Blocked;
                        task.gates.clear();
                    }
                    _ => {}
                }
                task.recompute_state();
            }
            EventType::RunClosed => {
                if let Some(run) = &event.run_id {
                    if let Some(runs) = open_runs.get_mut(&task_id) {
                        runs.retain(|r| r != run);
                        if runs.is_empty() {
                            open_runs.shift_remove(&task_id);
                        }
                    }
                }
            }
            _ => {}
        }
    }

    // Without a live watchdog, nothing will ever clear awaiting_verdict:
    // route those tasks to a human.
    if status.project.degraded_reason == Some(DegradedReason::WatchdogUnresponsive) {
        for task in tasks.values_mut() {
            if task.state.is_terminal() {
                continue;
            }
            if task.gates.contains(&Gate::AwaitingVerdict) {
                task.gates.insert(Gate::NeedsHumanReview);
            }
        }
    }

    status.locks.project = if project_running && !status.project.halted {
        LockPhase::Running
    } else {
        LockPhase::Idle
    };

    for (task_id, runs) in &open_runs {
        if runs.len() == 1 {
            status
                .locks
                .tasks
                .insert(task_id.clone(), runs[0].clone());
        } else {
            status.project.mode = Mode::Degraded;
            status.project.degraded_reason = Some(DegradedReason::MultipleOpenRuns);
            status.alerts.push(Alert {
                kind: "multiple_open_runs".to_string(),
                task_id: Some(task_id.clone()),
                run_ids: Some(runs.clone()),
                ..Alert::default()
            });
        }
    }

    let mut done_count = 0;
    let mut blocked_count = 0;
    for task in tasks.values() {
        if task.state == TaskState::Done {
            done_count += 1;
            status.tasks.push(TaskStatus {
                task_id: task.task_id.clone(),
                result_summary: task
                    .result
                    .get("summary")
                    .and_then(Value::as_str)
                    .map(str::to_string),
                evidence_path: task
                    .last_evidence
                    .get("evidencePath")
                    .and_then(Value::as_str)
                    .map(str::to_string),
                last_run_id: task.run_id.clone(),
                task_spec: task.task_spec.clone(),
                ..TaskStatus::default()
            });
        } else {
            if task.state == TaskState::Blocked {
                blocked_count += 1;
            }
            status.tasks.push(TaskStatus {
                task_id: task.task_id.clone(),
                state: Some(task.state),
                gates: task.gates.iter().copied().collect(),
                run_id: task.run_id.clone(),
                skill_decision: task.skill_decision.clone(),
                policy_tier: task.policy_tier.clone(),
                last_evidence: task.last_evidence.clone(),
                last_verdict: task.last_verdict.clone(),
                result: task.result.clone(),
                task_spec: task.task_spec.clone(),
                ..TaskStatus::default()
            });
        }
    }
    status.project.progress = Progress {
        total: status.tasks.len(),
        done: done_count,
        blocked: blocked_count,
    };
    status.updated_at = now;

    let mut alerts = Vec::new();
    for c in &corrupted {
        alerts.push(Alert {
            kind: "corrupted_line".to_string(),
            line: Some(c.line),
            reason: Some(c.reason.clone()),
            hash: Some(sha256_hex(&c.raw)),
            ..Alert::default()
        });
    }
    status.alerts.extend(alerts.iter().cloned());

    if emit_derived {
        emit_derived_files(layout, &events, &status)?;
    }

    Ok(ReplayResult {
        status,
        corrupted,
        alerts,
    })
}

/// Rewrite the read-only projections: the watchdog-verdict history and the
/// lock index.
fn emit_derived_files(
    layout: &ProjectLayout,
    events: &[Event],
    status: &Status,
) -> Result<(), ReduceError> {
    std::fs::create_dir_all(layout.derived_dir())?;

    let mut lines = String::new();
    for event in events {
        if event.kind == EventType::WatchdogVerdict {
            lines.push_str(&serde_json::to_string(&serde_json::to_value(event)?)?);
            lines.push('\n');
        }
    }
    std::fs::write(layout.verdicts_path(), lines)?;

    atomic_write_json(&layout.locks_index_path(), &status.locks)?;
    Ok(())
}

fn sha256_hex(raw: &str) -> String {
    let digest = Sha256::digest(raw.as_bytes());
    format!("{:x}", digest)
}

#[cfg(test)]
#[path = "reducer_tests.rs"]
mod tests;
