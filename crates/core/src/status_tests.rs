// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use serde_json::json;

#[test]
fn base_status_shape() {
    let status = Status::base("demo", "2026-01-15T12:00:00.000000Z".to_string());
    let value = serde_json::to_value(&status).unwrap();

    assert_eq!(value["project"]["name"], json!("demo"));
    assert_eq!(value["project"]["phase"], json!("running"));
    assert_eq!(value["project"]["halted"], json!(false));
    assert_eq!(value["project"]["mode"], json!("normal"));
    assert_eq!(value["project"]["degradedReason"], json!(null));
    assert_eq!(value["project"]["progress"], json!({"total": 0, "done": 0, "blocked": 0}));
    assert_eq!(value["watchdog"]["state"], json!("healthy"));
    assert_eq!(value["locks"]["project"], json!("idle"));
    assert_eq!(value["locks"]["tasks"], json!({}));
}

#[test]
fn degraded_reason_wire_names() {
    assert_eq!(
        serde_json::to_value(DegradedReason::WatchdogUnresponsive).unwrap(),
        json!("watchdog_unresponsive")
    );
    assert_eq!(
        serde_json::to_value(DegradedReason::MultipleOpenRuns).unwrap(),
        json!("multiple_open_runs")
    );
    assert_eq!(
        serde_json::to_value(DegradedReason::RecoveryInProgress).unwrap(),
        json!("recovery_in_progress")
    );
}

#[test]
fn gate_sort_order_matches_wire_alphabetical() {
    let mut gates = vec![
        Gate::NeedsHumanReview,
        Gate::AwaitingVerdict,
        Gate::AwaitingSkillDecision,
        Gate::AwaitingPolicyApproval,
    ];
    gates.sort();
    let wire: Vec<String> = gates
        .iter()
        .map(|g| serde_json::to_value(g).unwrap().as_str().unwrap().to_string())
        .collect();
    let mut sorted = wire.clone();
    sorted.sort();
    assert_eq!(wire, sorted);
}

#[yare::parameterized(
    pass  = { "PASS", Verdict::Pass },
    warn  = { "WARN", Verdict::Warn },
    block = { "BLOCK", Verdict::Block },
)]
fn verdict_wire_round_trip(wire: &str, verdict: Verdict) {
    assert_eq!(Verdict::from_wire(wire), Some(verdict));
    assert_eq!(verdict.as_str(), wire);
}

#[test]
fn verdict_rejects_unknown() {
    assert_eq!(Verdict::from_wire("MAYBE"), None);
}

#[test]
fn done_task_uses_compact_shape() {
    let task = TaskStatus {
        task_id: TaskId::new("DOCS-1"),
        result_summary: Some("ok".to_string()),
        evidence_path: Some("evidence/DOCS-1/r-1.md".to_string()),
        last_run_id: Some(RunId::new("r-1")),
        ..TaskStatus::default()
    };
    assert!(task.is_done());
    assert!(!task.is_blocked());

    let value = serde_json::to_value(&task).unwrap();
    let obj = value.as_object().unwrap();
    assert!(!obj.contains_key("state"));
    assert!(!obj.contains_key("gates"));
    assert_eq!(obj["lastRunId"], json!("r-1"));
}

#[test]
fn blocked_task_is_not_done() {
    let task = TaskStatus {
        task_id: TaskId::new("T-1"),
        state: Some(TaskState::Blocked),
        run_id: Some(RunId::new("r-2")),
        ..TaskStatus::default()
    };
    assert!(task.is_blocked());
    assert!(!task.is_done());
    assert_eq!(task.effective_run_id().unwrap().as_str(), "r-2");
}

#[test]
fn terminal_states() {
    assert!(TaskState::Done.is_terminal());
    assert!(TaskState::Blocked.is_terminal());
    assert!(TaskState::Canceled.is_terminal());
    assert!(!TaskState::Running.is_terminal());
    assert!(!TaskState::Pending.is_terminal());
}

#[test]
fn status_task_lookup() {
    let mut status = Status::base("demo", String::new());
    status.tasks.push(TaskStatus {
        task_id: TaskId::new("T-1"),
        state: Some(TaskState::Pending),
        ..TaskStatus::default()
    });
    assert!(status.task("T-1").is_some());
    assert!(status.task("T-2").is_none());
}

#[test]
fn status_round_trips_through_json() {
    let mut status = Status::base("demo", "2026-01-15T12:00:00.000000Z".to_string());
    status.locks.tasks.insert(TaskId::new("T-1"), RunId::new("r-1"));
    status.alerts.push(Alert {
        kind: "blocked".to_string(),
        task_id: Some(TaskId::new("T-1")),
        run_id: Some(RunId::new("r-1")),
        ..Alert::default()
    });

    let raw = serde_json::to_string(&status).unwrap();
    let back: Status = serde_json::from_str(&raw).unwrap();
    assert_eq!(back, status);
}
