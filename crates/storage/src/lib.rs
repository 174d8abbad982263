// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! Storage layer for Overseer: project layout, advisory file locks, and the
//! durable event-log writer.

mod atomic;
mod layout;
mod lock;
mod state_manager;

pub use atomic::{append_line, atomic_write_json};
pub use layout::ProjectLayout;
pub use lock::{FileLock, FileLockGuard, LockError, LockHolder, LOCK_POLL_INTERVAL, LOCK_TIMEOUT};
pub use state_manager::{AppendOutcome, StateError, StateManager};
