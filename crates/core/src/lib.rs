// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! ov-core: Core library for the Overseer (ov) orchestrator

pub mod clock;
pub mod codec;
pub mod event;
pub mod id;
pub mod status;
pub mod task;
pub mod team;
pub mod time;

pub use clock::{Clock, SystemClock};
#[cfg(any(test, feature = "test-support"))]
pub use clock::FakeClock;
pub use codec::{
    canonical_json, canonical_json_value, compute_crc32, compute_crc32_value, verify_crc32,
    verify_crc32_value, CodecError,
};
pub use event::{Event, EventType};
pub use id::{event_id, run_id, uuid_v7, IdGen, RunId, TaskId, UuidV7Gen};
#[cfg(any(test, feature = "test-support"))]
pub use id::SequentialIdGen;
pub use status::{
    Alert, DegradedReason, Gate, LockPhase, LocksStatus, Mode, Phase, Progress, ProjectStatus,
    Risk, Status, TaskState, TaskStatus, Verdict, WatchdogState, WatchdogStatus,
};
pub use task::{RiskLevel, TaskKind, TaskSpec};
pub use team::{Team, TeamDefaults};
pub use time::{format_utc, parse_utc};
