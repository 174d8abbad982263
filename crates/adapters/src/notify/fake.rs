// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fake notification adapter for testing
#![cfg_attr(coverage_nightly, coverage(off))]

use super::{NotifyAdapter, NotifyError};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::Arc;

/// Recorded notification
#[derive(Debug, Clone, PartialEq)]
pub struct NotifyCall {
    pub channel: String,
    pub message: String,
}

struct FakeNotifyState {
    calls: Vec<NotifyCall>,
    fail: bool,
}

/// Fake notification adapter for testing
#[derive(Clone)]
pub struct FakeNotifyAdapter {
    inner: Arc<Mutex<FakeNotifyState>>,
}

impl Default for FakeNotifyAdapter {
    fn default() -> Self {
        Self {
            inner: Arc::new(Mutex::new(FakeNotifyState {
                calls: Vec::new(),
                fail: false,
            })),
        }
    }
}

impl FakeNotifyAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get all recorded notifications
    pub fn calls(&self) -> Vec<NotifyCall> {
        self.inner.lock().calls.clone()
    }

    /// Make subsequent sends fail
    pub fn fail(&self) {
        self.inner.lock().fail = true;
    }
}

#[async_trait]
impl NotifyAdapter for FakeNotifyAdapter {
    async fn notify(&self, channel: &str, message: &str) -> Result<(), NotifyError> {
        let mut state = self.inner.lock();
        state.calls.push(NotifyCall {
            channel: channel.to_string(),
            message: message.to_string(),
        });
        if state.fail {
            return Err(NotifyError::SendFailed("fake failure".to_string()));
        }
        Ok(())
    }
}
