// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fake worker gateway for testing
#![cfg_attr(coverage_nightly, coverage(off))]

use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::Arc;

use super::{SpawnError, SpawnRequest, SpawnResult, WorkerGateway};

struct FakeWorkerState {
    requests: Vec<SpawnRequest>,
    fail_with: Option<String>,
}

/// Fake gateway that records spawn requests and can be scripted to fail.
#[derive(Clone)]
pub struct FakeWorkerGateway {
    inner: Arc<Mutex<FakeWorkerState>>,
}

impl Default for FakeWorkerGateway {
    fn default() -> Self {
        Self {
            inner: Arc::new(Mutex::new(FakeWorkerState {
                requests: Vec::new(),
                fail_with: None,
            })),
        }
    }
}

impl FakeWorkerGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// All recorded spawn requests
    pub fn requests(&self) -> Vec<SpawnRequest> {
        self.inner.lock().requests.clone()
    }

    /// Make subsequent spawns fail with the given message
    pub fn fail_with(&self, message: impl Into<String>) {
        self.inner.lock().fail_with = Some(message.into());
    }
}

#[async_trait]
impl WorkerGateway for FakeWorkerGateway {
    async fn spawn(&self, request: &SpawnRequest) -> Result<SpawnResult, SpawnError> {
        let mut state = self.inner.lock();
        state.requests.push(request.clone());
        if let Some(message) = &state.fail_with {
            return Err(SpawnError::Gateway(message.clone()));
        }
        Ok(SpawnResult {
            child_session_key: Some(format!("session:{}", request.label)),
            run_id: Some(request.run_id.to_string()),
        })
    }
}
