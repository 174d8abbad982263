// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Advisory file locking with a holder record.
//!
//! Locks are OS-level (`flock` via fs2) on a sidecar file, so mutual
//! exclusion holds across processes. The holder writes `{pid, acquiredAt}`
//! into the sidecar after acquisition; on timeout the waiter reads that
//! record back and reports who held the lock.

use fs2::FileExt;
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Default acquisition timeout.
pub const LOCK_TIMEOUT: Duration = Duration::from_secs(30);

/// Default polling interval while contended.
pub const LOCK_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Holder metadata recorded in the lock file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LockHolder {
    pub pid: u32,
    pub acquired_at: f64,
}

/// Errors from lock operations
#[derive(Debug, Error)]
pub enum LockError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("lock timeout on {} after {:?} (holder pid {})", path.display(), timeout, holder.pid)]
    Timeout {
        path: PathBuf,
        timeout: Duration,
        holder: LockHolder,
    },
}

/// An advisory lock on a sidecar file.
#[derive(Debug)]
pub struct FileLock {
    path: PathBuf,
    shared: bool,
}

impl FileLock {
    /// Exclusive lock on the given sidecar path.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            shared: false,
        }
    }

    /// Shared (read) lock on the given sidecar path.
    pub fn shared(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            shared: true,
        }
    }

    /// Poll until the lock is granted or the timeout elapses.
    ///
    /// On success the holder record is rewritten and the returned guard
    /// keeps the lock until dropped. On timeout the last recorded holder is
    /// attached to the error.
    pub fn acquire(
        &self,
        timeout: Duration,
        poll_interval: Duration,
    ) -> Result<FileLockGuard, LockError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .open(&self.path)?;

        let start = std::time::Instant::now();
        loop {
            // UFCS so the fs2 trait methods win over the std inherent ones
            let granted = if self.shared {
                FileExt::try_lock_shared(&file)
            } else {
                FileExt::try_lock_exclusive(&file)
            };
            match granted {
                Ok(()) => {
                    write_holder(&mut file)?;
                    return Ok(FileLockGuard { file: Some(file) });
                }
                Err(e) if is_contended(&e) => {
                    if start.elapsed() >= timeout {
                        return Err(LockError::Timeout {
                            path: self.path.clone(),
                            timeout,
                            holder: read_holder(&self.path).unwrap_or_default(),
                        });
                    }
                    std::thread::sleep(poll_interval);
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    /// Acquire with the default timeout and poll interval.
    pub fn acquire_default(&self) -> Result<FileLockGuard, LockError> {
        self.acquire(LOCK_TIMEOUT, LOCK_POLL_INTERVAL)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Holds the lock; unlocks and closes the descriptor on drop, so release
/// happens on every exit path.
#[derive(Debug)]
pub struct FileLockGuard {
    file: Option<File>,
}

impl FileLockGuard {
    /// Explicit release (equivalent to drop).
    pub fn release(mut self) {
        self.unlock();
    }

    fn unlock(&mut self) {
        if let Some(file) = self.file.take() {
            let _ = fs2::FileExt::unlock(&file);
        }
    }
}

impl Drop for FileLockGuard {
    fn drop(&mut self) {
        self.unlock();
    }
}

fn is_contended(err: &io::Error) -> bool {
    err.kind() == io::ErrorKind::WouldBlock
        || err.raw_os_error() == fs2::lock_contended_error().raw_os_error()
}

fn write_holder(file: &mut File) -> io::Result<()> {
    let now = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs_f64();
    let holder = LockHolder {
        pid: std::process::id(),
        acquired_at: now,
    };
    file.set_len(0)?;
    let body = serde_json::to_string(&holder).unwrap_or_default();
    file.write_all(body.as_bytes())?;
    file.flush()?;
    file.sync_all()
}

fn read_holder(path: &Path) -> Option<LockHolder> {
    let raw = std::fs::read_to_string(path).ok()?;
    serde_json::from_str(raw.trim()).ok()
}

#[cfg(test)]
#[path = "lock_tests.rs"]
mod tests;
