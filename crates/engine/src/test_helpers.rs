// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared fixtures for engine tests.

use serde_json::json;

use ov_adapters::{FakeNotifyAdapter, FakeWorkerGateway};
use ov_core::{codec, Event, EventType, FakeClock, SequentialIdGen};
use ov_storage::{append_line, ProjectLayout, StateManager};

use crate::config::Config;
use crate::orchestrator::Orchestrator;

pub(crate) type TestOrchestrator =
    Orchestrator<FakeClock, SequentialIdGen, FakeWorkerGateway, FakeNotifyAdapter>;

/// A temp project directory with a shared fake clock and a state manager
/// for seeding events.
pub(crate) struct TestProject {
    pub dir: tempfile::TempDir,
    pub clock: FakeClock,
    pub layout: ProjectLayout,
    pub state: StateManager<FakeClock, SequentialIdGen>,
}

impl TestProject {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("team.json"),
            json!({"project": "demo", "labels": {"orchestrator": "ov:demo:orchestrator"}})
                .to_string(),
        )
        .unwrap();
        let clock = FakeClock::new();
        let layout = ProjectLayout::new(dir.path());
        let state = StateManager::new(layout.clone(), clock.clone(), SequentialIdGen::new("x"));
        Self {
            dir,
            clock,
            layout,
            state,
        }
    }

    pub fn config(&self) -> Config {
        Config::new(self.dir.path())
    }

    /// Event builder scoped to the test project.
    pub fn event(&self, kind: EventType, actor: &str, key: &str) -> Event {
        Event::new(kind, "demo").with_actor(actor).with_key(key)
    }

    /// Append through the state manager, panicking on dedup.
    pub fn append(&self, event: Event) -> Event {
        self.state
            .append_event(event)
            .unwrap()
            .event()
            .expect("event should append, not dedup")
            .clone()
    }

    /// Write a pre-built event straight to the log with a valid CRC,
    /// bypassing the state manager (for fold-level tests that need full
    /// control of sequence numbers and duplicate keys).
    pub fn append_raw(&self, mut event: Event) {
        self.layout.ensure_dirs().unwrap();
        event.crc32 = Some(codec::compute_crc32(&event).unwrap());
        let value = serde_json::to_value(&event).unwrap();
        append_line(&self.layout.events_path(), &serde_json::to_string(&value).unwrap()).unwrap();
    }

    /// Orchestrator over this project with fake adapters, default config.
    pub fn orchestrator(&self) -> (TestOrchestrator, FakeWorkerGateway, FakeNotifyAdapter) {
        self.orchestrator_with(self.config())
    }

    pub fn orchestrator_with(
        &self,
        config: Config,
    ) -> (TestOrchestrator, FakeWorkerGateway, FakeNotifyAdapter) {
        let gateway = FakeWorkerGateway::new();
        let notifier = FakeNotifyAdapter::new();
        let orchestrator = Orchestrator::new(
            config,
            self.clock.clone(),
            SequentialIdGen::new("e"),
            SequentialIdGen::new("r"),
            gateway.clone(),
            notifier.clone(),
        );
        (orchestrator, gateway, notifier)
    }

    /// All decodable events currently in the log, sorted. Corrupted lines
    /// are skipped (they have their own assertions where relevant).
    pub fn events(&self) -> Vec<Event> {
        let (mut events, _) = crate::reducer::read_events(&self.layout.events_path());
        crate::reducer::sort_events(&mut events);
        events
    }

    /// Count events of a kind in the log.
    pub fn count(&self, kind: EventType) -> usize {
        self.events().iter().filter(|e| e.kind == kind).count()
    }
}
