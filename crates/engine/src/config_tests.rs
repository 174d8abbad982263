// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn defaults() {
    let config = Config::new("/proj");
    assert_eq!(config.heartbeat_timeout_sec, 180);
    assert_eq!(config.worker_timeout_minutes, 30);
    assert_eq!(config.stale_run_minutes, 30);
    assert_eq!(config.max_retries, 3);
    assert_eq!(config.retry_delay_seconds, 60);
}

#[test]
fn load_without_file_uses_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let config = Config::load(dir.path());
    assert_eq!(config.heartbeat_timeout_sec, 180);
    assert_eq!(config.base_dir, dir.path());
}

#[test]
fn overlay_overrides_selected_fields() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join("orchestrator.toml"),
        "heartbeatTimeoutSec = 60\nmaxRetries = 0\n",
    )
    .unwrap();

    let config = Config::load(dir.path());
    assert_eq!(config.heartbeat_timeout_sec, 60);
    assert_eq!(config.max_retries, 0);
    // untouched fields keep defaults
    assert_eq!(config.worker_timeout_minutes, 30);
    assert_eq!(config.stale_run_minutes, 30);
}

#[test]
fn malformed_overlay_is_ignored() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("orchestrator.toml"), "not [valid toml").unwrap();
    let config = Config::load(dir.path());
    assert_eq!(config.heartbeat_timeout_sec, 180);
}
