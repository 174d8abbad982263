// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Orchestrator configuration.

use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Tunable thresholds for one orchestrated project.
///
/// `stale_run_minutes` is deliberately independent of
/// `worker_timeout_minutes`: staleness covers runs abandoned across a
/// restart, the worker timeout covers runs that are still nominally live.
#[derive(Debug, Clone)]
pub struct Config {
    pub base_dir: PathBuf,
    pub heartbeat_timeout_sec: u64,
    pub worker_timeout_minutes: u64,
    pub stale_run_minutes: u64,
    /// 0 disables auto-retry.
    pub max_retries: u32,
    pub retry_delay_seconds: u64,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ConfigOverlay {
    heartbeat_timeout_sec: Option<u64>,
    worker_timeout_minutes: Option<u64>,
    stale_run_minutes: Option<u64>,
    max_retries: Option<u32>,
    retry_delay_seconds: Option<u64>,
}

impl Config {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
            heartbeat_timeout_sec: 180,
            worker_timeout_minutes: 30,
            stale_run_minutes: 30,
            max_retries: 3,
            retry_delay_seconds: 60,
        }
    }

    /// Defaults overlaid with `<base>/orchestrator.toml` when present.
    /// A missing or unreadable file is not an error.
    pub fn load(base_dir: impl Into<PathBuf>) -> Self {
        let mut config = Self::new(base_dir);
        let overlay_path = config.base_dir.join("orchestrator.toml");
        if let Some(overlay) = read_overlay(&overlay_path) {
            if let Some(v) = overlay.heartbeat_timeout_sec {
                config.heartbeat_timeout_sec = v;
            }
            if let Some(v) = overlay.worker_timeout_minutes {
                config.worker_timeout_minutes = v;
            }
            if let Some(v) = overlay.stale_run_minutes {
                config.stale_run_minutes = v;
            }
            if let Some(v) = overlay.max_retries {
                config.max_retries = v;
            }
            if let Some(v) = overlay.retry_delay_seconds {
                config.retry_delay_seconds = v;
            }
        }
        config
    }
}

fn read_overlay(path: &Path) -> Option<ConfigOverlay> {
    let raw = std::fs::read_to_string(path).ok()?;
    match toml::from_str(&raw) {
        Ok(overlay) => Some(overlay),
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "ignoring malformed orchestrator.toml");
            None
        }
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
