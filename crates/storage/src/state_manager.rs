// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Durable event-log writer: idempotent append, sequence numbering, and
//! atomic status publication.
//!
//! All writes happen under the exclusive sidecar lock of the target file.
//! The idempotency index and sequence file are private to the writer: they
//! are only ever read or written while the events-log lock is held.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::io::{self, BufRead, BufReader};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

use ov_core::{codec, format_utc, Clock, CodecError, Event, EventType, IdGen, Status};

use crate::atomic::{append_line, atomic_write_json};
use crate::layout::ProjectLayout;
use crate::lock::{FileLock, LockError, LockHolder, LOCK_POLL_INTERVAL};

/// Errors from state-manager operations
#[derive(Debug, Error)]
pub enum StateError {
    #[error("idempotencyKey is required")]
    MissingIdempotencyKey,
    #[error(transparent)]
    Lock(#[from] LockError),
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Codec(#[from] CodecError),
}

/// Result of an append: either the persisted event (with all fields filled)
/// or a silent dedup.
#[derive(Debug, Clone, PartialEq)]
pub enum AppendOutcome {
    Appended(Event),
    Deduped,
}

impl AppendOutcome {
    pub fn event(&self) -> Option<&Event> {
        match self {
            AppendOutcome::Appended(event) => Some(event),
            AppendOutcome::Deduped => None,
        }
    }

    pub fn is_appended(&self) -> bool {
        matches!(self, AppendOutcome::Appended(_))
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SequenceFile {
    last_sequence: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    updated_at: Option<String>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct IdempotencyIndex {
    #[serde(default)]
    keys: BTreeMap<String, u64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SecurityLogEntry<'a> {
    #[serde(rename = "type")]
    kind: &'a str,
    path: String,
    /// Acquisition timeout in seconds.
    timeout: f64,
    holder: LockHolder,
    at: String,
}

/// Append-only writer for one project's event log.
pub struct StateManager<C: Clock, G: IdGen> {
    layout: ProjectLayout,
    clock: C,
    event_ids: G,
    lock_timeout: Duration,
}

impl<C: Clock, G: IdGen> StateManager<C, G> {
    pub fn new(layout: ProjectLayout, clock: C, event_ids: G) -> Self {
        Self {
            layout,
            clock,
            event_ids,
            lock_timeout: crate::lock::LOCK_TIMEOUT,
        }
    }

    pub fn with_lock_timeout(mut self, timeout: Duration) -> Self {
        self.lock_timeout = timeout;
        self
    }

    pub fn layout(&self) -> &ProjectLayout {
        &self.layout
    }

    /// Append an event to `audit/events.ndjson`.
    ///
    /// Under the exclusive events-log lock: dedup on `idempotencyKey`, assign
    /// the next sequence number, fill missing envelope fields, CRC-protect,
    /// append + fsync, then atomically persist the index and sequence files.
    pub fn append_event(&self, event: Event) -> Result<AppendOutcome, StateError> {
        let key = event
            .idempotency_key
            .clone()
            .ok_or(StateError::MissingIdempotencyKey)?;

        self.layout.ensure_dirs()?;
        let lock = FileLock::new(ProjectLayout::lock_path(&self.layout.events_path()));
        let guard = match lock.acquire(self.lock_timeout, LOCK_POLL_INTERVAL) {
            Ok(guard) => guard,
            Err(e) => return Err(self.log_lock_timeout(e, &self.layout.events_path())),
        };

        let mut index = self.load_idempotency_index();
        if index.keys.contains_key(&key) {
            debug!(key = %key, "append deduped");
            return Ok(AppendOutcome::Deduped);
        }

        let seq = self.read_last_sequence() + 1;
        let mut event = event;
        if event.event_id.is_none() {
            event.event_id = Some(self.event_ids.next());
        }
        if event.sequence_number.is_none() {
            event.sequence_number = Some(seq);
        }
        if event.at.is_none() {
            event.at = Some(format_utc(self.clock.now_utc()));
        }
        event.crc32 = Some(codec::compute_crc32(&event)?);

        // Canonical on-disk form: sorted keys, compact, crc32 filled in.
        let value = serde_json::to_value(&event)?;
        append_line(&self.layout.events_path(), &serde_json::to_string(&value)?)?;

        index.keys.insert(key, seq);
        atomic_write_json(&self.layout.idempotency_index_path(), &index)?;
        atomic_write_json(
            &self.layout.sequence_path(),
            &SequenceFile {
                last_sequence: seq,
                updated_at: Some(format_utc(self.clock.now_utc())),
            },
        )?;

        drop(guard);
        debug!(seq, kind = %event.kind, "event appended");
        Ok(AppendOutcome::Appended(event))
    }

    /// Atomically publish `status.json` under its sidecar lock.
    pub fn write_status(&self, status: &Status) -> Result<(), StateError> {
        self.layout.ensure_dirs()?;
        let lock = FileLock::new(ProjectLayout::lock_path(&self.layout.status_path()));
        let guard = match lock.acquire(self.lock_timeout, LOCK_POLL_INTERVAL) {
            Ok(guard) => guard,
            Err(e) => return Err(self.log_lock_timeout(e, &self.layout.status_path())),
        };
        atomic_write_json(&self.layout.status_path(), status)?;
        drop(guard);
        Ok(())
    }

    /// Template pair for a corrupted log line: `CORRUPTED_LINE_DETECTED`
    /// followed by `RECOVERY_STARTED`, both keyed by
    /// `(project, lineOffset, sha256(rawLine))` so repeated restarts over the
    /// same corruption collapse via idempotency.
    pub fn corrupted_event_pair(
        &self,
        line_offset: u64,
        raw_line: &str,
        reason: &str,
        project: &str,
    ) -> (Event, Event) {
        let content_hash = sha256_hex(raw_line);
        let build = |kind: EventType| {
            Event::new(kind, project)
                .with_actor("orchestrator")
                .with_field("lineOffset", line_offset)
                .with_field("contentHash", content_hash.clone())
                .with_field("reason", reason)
                .with_key(format!(
                    "{project}:{}:{line_offset}:{content_hash}",
                    kind.as_str()
                ))
        };
        (
            build(EventType::CorruptedLineDetected),
            build(EventType::RecoveryStarted),
        )
    }

    /// Last persisted sequence number. Primary source is
    /// `derived/sequence.json`; if that is missing or unreadable, recover
    /// from the last non-empty line of the log; fall back to 0.
    fn read_last_sequence(&self) -> u64 {
        if let Ok(raw) = std::fs::read_to_string(self.layout.sequence_path()) {
            if let Ok(seq) = serde_json::from_str::<SequenceFile>(&raw) {
                return seq.last_sequence;
            }
        }
        self.last_sequence_from_log().unwrap_or(0)
    }

    fn last_sequence_from_log(&self) -> Option<u64> {
        let file = std::fs::File::open(self.layout.events_path()).ok()?;
        let mut last = None;
        for line in BufReader::new(file).lines() {
            let line = line.ok()?;
            if !line.trim().is_empty() {
                last = Some(line);
            }
        }
        let value: Value = serde_json::from_str(last?.trim()).ok()?;
        value.get("sequenceNumber").and_then(Value::as_u64)
    }

    fn load_idempotency_index(&self) -> IdempotencyIndex {
        std::fs::read_to_string(self.layout.idempotency_index_path())
            .ok()
            .and_then(|raw| serde_json::from_str(&raw).ok())
            .unwrap_or_default()
    }

    /// Record a lock timeout in `audit/security.log` and pass the error on.
    fn log_lock_timeout(&self, err: LockError, target: &std::path::Path) -> StateError {
        if let LockError::Timeout {
            timeout, holder, ..
        } = &err
        {
            let entry = SecurityLogEntry {
                kind: EventType::LockTimeoutDetected.as_str(),
                path: target.display().to_string(),
                timeout: timeout.as_secs_f64(),
                holder: holder.clone(),
                at: format_utc(self.clock.now_utc()),
            };
            match serde_json::to_string(&entry) {
                Ok(line) => {
                    if let Err(io_err) = append_line(&self.layout.security_log_path(), &line) {
                        warn!(error = %io_err, "failed to append security log entry");
                    }
                }
                Err(json_err) => warn!(error = %json_err, "failed to encode security log entry"),
            }
        }
        err.into()
    }
}

fn sha256_hex(raw: &str) -> String {
    let digest = Sha256::digest(raw.as_bytes());
    format!("{:x}", digest)
}

#[cfg(test)]
#[path = "state_manager_tests.rs"]
mod tests;
