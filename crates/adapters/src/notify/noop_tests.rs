// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[tokio::test]
async fn noop_always_succeeds() {
    let adapter = NoOpNotifyAdapter::new();
    assert!(adapter.notify("desktop", "hello").await.is_ok());
}
