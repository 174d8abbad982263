// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Gateway adapter that shells out to the session-gateway CLI.
//!
//! Invocation shape: `<program> sessions spawn --task <prompt> --label <label>
//! --cleanup <policy> --json`. The reply is a JSON document; the spawned
//! session's identifiers may sit at the top level or under `result.details`,
//! depending on gateway version.

use async_trait::async_trait;
use serde_json::Value;
use tokio::process::Command;
use tracing::debug;

use super::{SpawnError, SpawnRequest, SpawnResult, WorkerGateway};
use crate::subprocess::{run_with_timeout, GATEWAY_TIMEOUT};

/// Spawns workers by invoking an external gateway CLI.
#[derive(Debug, Clone)]
pub struct GatewayCliWorker {
    program: String,
}

impl GatewayCliWorker {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

#[async_trait]
impl WorkerGateway for GatewayCliWorker {
    async fn spawn(&self, request: &SpawnRequest) -> Result<SpawnResult, SpawnError> {
        let mut cmd = Command::new(&self.program);
        cmd.arg("sessions")
            .arg("spawn")
            .arg("--task")
            .arg(&request.task)
            .arg("--label")
            .arg(&request.label)
            .arg("--cleanup")
            .arg(&request.cleanup)
            .arg("--json");

        let output = run_with_timeout(cmd, GATEWAY_TIMEOUT, "gateway spawn")
            .await
            .map_err(SpawnError::Gateway)?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(SpawnError::Gateway(format!(
                "gateway exited with {}: {}",
                output.status,
                stderr.trim()
            )));
        }

        let reply: Value = serde_json::from_slice(&output.stdout)
            .map_err(|e| SpawnError::MalformedReply(e.to_string()))?;
        let details = unwrap_details(&reply);
        debug!(task = %request.task_id, run = %request.run_id, "gateway spawn reply parsed");

        Ok(SpawnResult {
            child_session_key: details
                .get("childSessionKey")
                .and_then(Value::as_str)
                .map(str::to_string),
            run_id: details
                .get("runId")
                .and_then(Value::as_str)
                .map(str::to_string),
        })
    }
}

/// Older gateways nest the reply under `result.details`, sometimes with the
/// actual document re-encoded inside a `content[0].text` string.
fn unwrap_details(reply: &Value) -> Value {
    let result = reply.get("result").unwrap_or(reply);
    let details = result.get("details").unwrap_or(result);
    if let Some(text) = details
        .pointer("/content/0/text")
        .and_then(Value::as_str)
    {
        if let Ok(parsed) = serde_json::from_str::<Value>(text) {
            return parsed;
        }
    }
    details.clone()
}

#[cfg(test)]
#[path = "gateway_cli_tests.rs"]
mod tests;
