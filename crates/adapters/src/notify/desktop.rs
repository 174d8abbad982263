// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Desktop notification adapter using notify-rust.

use super::{NotifyAdapter, NotifyError};
use async_trait::async_trait;

#[derive(Clone, Copy, Debug, Default)]
pub struct DesktopNotifyAdapter;

impl DesktopNotifyAdapter {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl NotifyAdapter for DesktopNotifyAdapter {
    async fn notify(&self, channel: &str, message: &str) -> Result<(), NotifyError> {
        let summary = channel.to_string();
        let body = message.to_string();
        // Notification::show() is synchronous; fire-and-forget on the
        // bounded blocking pool so the tick is never held up by the
        // notification daemon.
        tokio::task::spawn_blocking(move || {
            match notify_rust::Notification::new()
                .summary(&summary)
                .body(&body)
                .show()
            {
                Ok(_) => tracing::info!(%summary, "desktop notification sent"),
                Err(e) => tracing::warn!(%summary, error = %e, "desktop notification failed"),
            }
        });
        Ok(())
    }
}
