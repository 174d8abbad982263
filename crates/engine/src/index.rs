// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-tick indexes over the sorted event slice.
//!
//! The orchestrator needs a handful of lookups the reducer does not expose:
//! which BLOCK verdicts were already answered with a halt, which runs are
//! aborted/closed, the latest lifecycle timestamps, and the per-run
//! lifecycle accumulation used for restart reconciliation. All of them are
//! built in one pass here.

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use std::collections::HashSet;

use ov_core::{parse_utc, Event, EventType, RunId, TaskId, Verdict};

/// Project-level lookups for policy enforcement.
#[derive(Debug, Default)]
pub struct EventIndex {
    /// Verdict event ids already answered by a `PROJECT_HALTED`.
    pub halted_by_verdict: HashSet<String>,
    pub aborted: HashSet<(TaskId, RunId)>,
    pub closed: HashSet<(TaskId, RunId)>,
    pub last_heartbeat_at: Option<DateTime<Utc>>,
    pub last_started_at: Option<DateTime<Utc>>,
    pub last_resumed_at: Option<DateTime<Utc>>,
    pub last_halted_at: Option<DateTime<Utc>>,
    pub last_finished_at: Option<DateTime<Utc>>,
}

fn keep_latest(slot: &mut Option<DateTime<Utc>>, ts: Option<DateTime<Utc>>) {
    if let Some(ts) = ts {
        if slot.map(|prev| ts > prev).unwrap_or(true) {
            *slot = Some(ts);
        }
    }
}

impl EventIndex {
    pub fn build(events: &[Event]) -> Self {
        let mut index = Self::default();
        for event in events {
            let ts = event.at.as_deref().and_then(parse_utc);
            match event.kind {
                EventType::ProjectHalted => {
                    let verdict_id = event
                        .causation_id
                        .clone()
                        .or_else(|| event.payload_str("verdictEventId").map(str::to_string));
                    if let Some(id) = verdict_id {
                        index.halted_by_verdict.insert(id);
                    }
                    keep_latest(&mut index.last_halted_at, ts);
                }
                EventType::WorkerRunAborted => {
                    if let (Some(task), Some(run)) = (&event.task_id, &event.run_id) {
                        index.aborted.insert((task.clone(), run.clone()));
                    }
                }
                EventType::RunClosed => {
                    if let (Some(task), Some(run)) = (&event.task_id, &event.run_id) {
                        index.closed.insert((task.clone(), run.clone()));
                    }
                }
                EventType::WatchdogHeartbeat => keep_latest(&mut index.last_heartbeat_at, ts),
                EventType::ProjectStarted => keep_latest(&mut index.last_started_at, ts),
                EventType::ProjectResumed => keep_latest(&mut index.last_resumed_at, ts),
                EventType::ProjectFinished => keep_latest(&mut index.last_finished_at, ts),
                _ => {}
            }
        }
        index
    }

    /// Heartbeat checks are suppressed once the project is finished or
    /// halted (until a later start/resume).
    pub fn heartbeat_suppressed(&self) -> bool {
        if let Some(finished) = self.last_finished_at {
            if self.last_started_at.map(|s| finished > s).unwrap_or(true) {
                return true;
            }
        }
        if let Some(halted) = self.last_halted_at {
            if self.last_resumed_at.map(|r| halted > r).unwrap_or(true) {
                return true;
            }
        }
        false
    }
}

/// Lifecycle accumulation for one `(taskId, runId)`.
#[derive(Debug, Clone, Default)]
pub struct RunInfo {
    pub closed: bool,
    pub completed: bool,
    pub failed: bool,
    pub aborted: bool,
    pub verdict: Option<Verdict>,
    pub intent_at: Option<DateTime<Utc>>,
    pub started_at: Option<DateTime<Utc>>,
    pub last_event_at: Option<DateTime<Utc>>,
    pub verdict_event_id: Option<String>,
    pub completed_event_id: Option<String>,
    pub failed_event_id: Option<String>,
    pub aborted_event_id: Option<String>,
}

impl RunInfo {
    /// A terminal signal exists: the run can be closed outright.
    pub fn has_terminal_signal(&self) -> bool {
        self.verdict == Some(Verdict::Block)
            || self.failed
            || self.aborted
            || (self.completed && self.verdict == Some(Verdict::Pass))
    }

    /// The event that justifies closing this run, most specific first.
    pub fn terminal_event_id(&self) -> Option<&str> {
        self.verdict_event_id
            .as_deref()
            .or(self.failed_event_id.as_deref())
            .or(self.aborted_event_id.as_deref())
            .or(self.completed_event_id.as_deref())
    }

    /// Reference timestamp for staleness: intent if known, else start.
    pub fn baseline(&self) -> Option<DateTime<Utc>> {
        self.intent_at.or(self.started_at)
    }
}

/// Per-run ledger over every `(taskId, runId)` seen in the log.
#[derive(Debug, Default)]
pub struct RunLedger {
    runs: IndexMap<(TaskId, RunId), RunInfo>,
}

impl RunLedger {
    /// Build from events already sorted by sequence number.
    pub fn build(events: &[Event]) -> Self {
        let mut ledger = Self::default();
        for event in events {
            let (Some(task), Some(run)) = (&event.task_id, &event.run_id) else {
                continue;
            };
            let info = ledger
                .runs
                .entry((task.clone(), run.clone()))
                .or_default();
            let ts = event.at.as_deref().and_then(parse_utc);
            if let Some(ts) = ts {
                if info.last_event_at.map(|prev| ts > prev).unwrap_or(true) {
                    info.last_event_at = Some(ts);
                }
            }
            match event.kind {
                EventType::WorkerRunIntent => {
                    if info.intent_at.is_none() {
                        info.intent_at = ts;
                    }
                }
                EventType::WorkerRunStarted => {
                    if info.started_at.is_none() {
                        info.started_at = ts;
                    }
                }
                EventType::WorkerRunCompleted => {
                    info.completed = true;
                    info.completed_event_id = event.event_id.clone();
                }
                EventType::WorkerRunFailed => {
                    info.failed = true;
                    info.failed_event_id = event.event_id.clone();
                }
                EventType::WorkerRunAborted => {
                    info.aborted = true;
                    info.aborted_event_id = event.event_id.clone();
                }
                EventType::WatchdogVerdict | EventType::HumanVerdict => {
                    info.verdict = event.payload_str("verdict").and_then(Verdict::from_wire);
                    info.verdict_event_id = event.event_id.clone();
                }
                EventType::RunClosed => {
                    info.closed = true;
                }
                _ => {}
            }
        }
        ledger
    }

    pub fn get(&self, task: &TaskId, run: &RunId) -> Option<&RunInfo> {
        self.runs.get(&(task.clone(), run.clone()))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&(TaskId, RunId), &RunInfo)> {
        self.runs.iter()
    }

    /// Runs with no `RUN_CLOSED` yet, in first-seen order.
    pub fn open_runs(&self) -> impl Iterator<Item = (&(TaskId, RunId), &RunInfo)> {
        self.runs.iter().filter(|(_, info)| !info.closed)
    }
}

#[cfg(test)]
#[path = "index_tests.rs"]
mod tests;
