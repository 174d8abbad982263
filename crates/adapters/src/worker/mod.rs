// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Worker-spawning gateway adapter.
//!
//! The orchestrator never manages worker processes itself: it hands a task
//! prompt to an external session gateway and records whatever identifiers
//! come back in the `WORKER_RUN_STARTED` payload.

mod gateway_cli;

pub use gateway_cli::GatewayCliWorker;

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
mod fake;
#[cfg(any(test, feature = "test-support"))]
pub use fake::FakeWorkerGateway;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use ov_core::{RunId, TaskId};

/// Errors from spawn operations
#[derive(Debug, Error)]
pub enum SpawnError {
    #[error("gateway invocation failed: {0}")]
    Gateway(String),
    #[error("gateway returned malformed reply: {0}")]
    MalformedReply(String),
}

/// What to spawn.
#[derive(Debug, Clone, PartialEq)]
pub struct SpawnRequest {
    pub task_id: TaskId,
    pub run_id: RunId,
    /// Full task prompt handed to the worker session.
    pub task: String,
    /// Session label, e.g. `ov:<project>:worker:<taskId>`.
    pub label: String,
    /// Session cleanup policy understood by the gateway (`keep`/`delete`).
    pub cleanup: String,
}

/// Identifiers the gateway reports back for a spawned session.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpawnResult {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub child_session_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub run_id: Option<String>,
}

/// Adapter for spawning worker sessions through the external gateway.
#[async_trait]
pub trait WorkerGateway: Clone + Send + Sync + 'static {
    async fn spawn(&self, request: &SpawnRequest) -> Result<SpawnResult, SpawnError>;
}
