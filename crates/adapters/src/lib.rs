// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! External collaborator adapters for Overseer: the worker-spawning gateway
//! and the result-notification sink.

mod notify;
mod subprocess;
mod worker;

pub use notify::{DesktopNotifyAdapter, NoOpNotifyAdapter, NotifyAdapter, NotifyError};
#[cfg(any(test, feature = "test-support"))]
pub use notify::{FakeNotifyAdapter, NotifyCall};
pub use subprocess::run_with_timeout;
pub use worker::{GatewayCliWorker, SpawnError, SpawnRequest, SpawnResult, WorkerGateway};
#[cfg(any(test, feature = "test-support"))]
pub use worker::FakeWorkerGateway;
