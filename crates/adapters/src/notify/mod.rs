// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Notification adapters.
//!
//! Delivery is fire-and-forget: the tick records `RESULT_NOTIFIED` in the
//! event log regardless, so the marker, not the transport, is authoritative.

mod desktop;
mod noop;

pub use desktop::DesktopNotifyAdapter;
pub use noop::NoOpNotifyAdapter;

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
mod fake;
#[cfg(any(test, feature = "test-support"))]
pub use fake::{FakeNotifyAdapter, NotifyCall};

use async_trait::async_trait;
use thiserror::Error;

/// Errors from notify operations
#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("send failed: {0}")]
    SendFailed(String),
}

/// Adapter for delivering result notifications to a channel.
#[async_trait]
pub trait NotifyAdapter: Clone + Send + Sync + 'static {
    /// Deliver a message on the named channel (e.g. `desktop`, `console`).
    async fn notify(&self, channel: &str, message: &str) -> Result<(), NotifyError>;
}
