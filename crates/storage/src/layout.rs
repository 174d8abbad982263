// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! On-disk layout of a project directory.
//!
//! ```text
//! <base>/
//!   team.json
//!   registry.json
//!   status.json
//!   audit/events.ndjson      append-only event log
//!   audit/security.log       lock-timeout diagnostics
//!   derived/sequence.json
//!   derived/idempotency-index.json
//!   derived/watchdog-verdicts.ndjson
//!   derived/locks-index.json
//!   evidence/<taskId>/<runId>.md
//! ```
//!
//! Each critical file has a `<file>.lock` sidecar for advisory locking.

use std::io;
use std::path::{Path, PathBuf};

/// Path accessors for one project directory.
#[derive(Debug, Clone)]
pub struct ProjectLayout {
    base_dir: PathBuf,
}

impl ProjectLayout {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    pub fn team_path(&self) -> PathBuf {
        self.base_dir.join("team.json")
    }

    pub fn registry_path(&self) -> PathBuf {
        self.base_dir.join("registry.json")
    }

    pub fn status_path(&self) -> PathBuf {
        self.base_dir.join("status.json")
    }

    pub fn audit_dir(&self) -> PathBuf {
        self.base_dir.join("audit")
    }

    pub fn events_path(&self) -> PathBuf {
        self.audit_dir().join("events.ndjson")
    }

    pub fn security_log_path(&self) -> PathBuf {
        self.audit_dir().join("security.log")
    }

    pub fn derived_dir(&self) -> PathBuf {
        self.base_dir.join("derived")
    }

    pub fn sequence_path(&self) -> PathBuf {
        self.derived_dir().join("sequence.json")
    }

    pub fn idempotency_index_path(&self) -> PathBuf {
        self.derived_dir().join("idempotency-index.json")
    }

    pub fn verdicts_path(&self) -> PathBuf {
        self.derived_dir().join("watchdog-verdicts.ndjson")
    }

    pub fn locks_index_path(&self) -> PathBuf {
        self.derived_dir().join("locks-index.json")
    }

    pub fn evidence_dir(&self) -> PathBuf {
        self.base_dir.join("evidence")
    }

    pub fn evidence_file(&self, task_id: &str, run_id: &str) -> PathBuf {
        self.evidence_dir().join(task_id).join(format!("{run_id}.md"))
    }

    /// Lock sidecar for a critical file: `<file>.lock`.
    pub fn lock_path(file: &Path) -> PathBuf {
        let mut name = file
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".lock");
        file.with_file_name(name)
    }

    /// Create `audit/` and `derived/` if absent.
    pub fn ensure_dirs(&self) -> io::Result<()> {
        std::fs::create_dir_all(self.audit_dir())?;
        std::fs::create_dir_all(self.derived_dir())?;
        Ok(())
    }
}

#[cfg(test)]
#[path = "layout_tests.rs"]
mod tests;
