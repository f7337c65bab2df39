//! Test doubles and common utilities for contract tests
//!
//! Scripted clients and counter-instrumented stores let the tests drive
//! poll cycles deterministically without any real courier API.

use async_trait::async_trait;
use serde_json::Value;
use shiptrack_core::config::EngineConfig;
use shiptrack_core::engine::EngineEvent;
use shiptrack_core::error::{Error, Result};
use shiptrack_core::state::MemoryTrackedStore;
use shiptrack_core::traits::{CourierClient, TrackedStore};
use shiptrack_core::Courier;
use std::collections::{BTreeSet, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;

/// A courier client that replays a scripted sequence of fetch results
///
/// Clones share the script and counters, so a test can keep a handle after
/// boxing the client into the engine.
#[derive(Clone)]
pub struct ScriptedCourierClient {
    courier: Courier,
    script: Arc<Mutex<VecDeque<std::result::Result<Vec<Value>, String>>>>,
    fetch_calls: Arc<AtomicUsize>,
}

impl ScriptedCourierClient {
    pub fn new(courier: Courier) -> Self {
        Self {
            courier,
            script: Arc::new(Mutex::new(VecDeque::new())),
            fetch_calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Queue a successful fetch result
    pub fn push_ok(&self, parcels: Vec<Value>) {
        self.script.lock().unwrap().push_back(Ok(parcels));
    }

    /// Queue a failed fetch
    pub fn push_err(&self, message: &str) {
        self.script
            .lock()
            .unwrap()
            .push_back(Err(message.to_string()));
    }

    pub fn fetch_call_count(&self) -> usize {
        self.fetch_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CourierClient for ScriptedCourierClient {
    async fn fetch_parcels(&self) -> Result<Vec<Value>> {
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);
        let step = self.script.lock().unwrap().pop_front();
        match step {
            Some(Ok(parcels)) => Ok(parcels),
            Some(Err(message)) => Err(Error::courier_api(message)),
            None => Err(Error::courier_api("script exhausted")),
        }
    }

    fn courier(&self) -> Courier {
        self.courier
    }
}

/// A memory-backed store that counts saves and flushes
#[derive(Clone, Default)]
pub struct CountingTrackedStore {
    inner: MemoryTrackedStore,
    save_calls: Arc<AtomicUsize>,
    flush_calls: Arc<AtomicUsize>,
}

impl CountingTrackedStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn save_call_count(&self) -> usize {
        self.save_calls.load(Ordering::SeqCst)
    }

    pub fn flush_call_count(&self) -> usize {
        self.flush_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TrackedStore for CountingTrackedStore {
    async fn load(&self, account_id: &str) -> Result<Option<BTreeSet<String>>> {
        self.inner.load(account_id).await
    }

    async fn save(&self, account_id: &str, tracked: &BTreeSet<String>) -> Result<()> {
        self.save_calls.fetch_add(1, Ordering::SeqCst);
        self.inner.save(account_id, tracked).await
    }

    async fn remove(&self, account_id: &str) -> Result<()> {
        self.inner.remove(account_id).await
    }

    async fn list_accounts(&self) -> Result<Vec<String>> {
        self.inner.list_accounts().await
    }

    async fn flush(&self) -> Result<()> {
        self.flush_calls.fetch_add(1, Ordering::SeqCst);
        self.inner.flush().await
    }
}

/// Engine config suitable for tests: short interval, small channel
pub fn engine_config() -> EngineConfig {
    EngineConfig {
        poll_interval_secs: 1,
        startup_delay_secs: 0,
        event_channel_capacity: 100,
    }
}

/// Drain all currently queued engine events
pub fn drain_events(rx: &mut mpsc::Receiver<EngineEvent>) -> Vec<EngineEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

/// Keys of ParcelAppeared events, in emission order
pub fn appeared_keys(events: &[EngineEvent]) -> Vec<String> {
    events
        .iter()
        .filter_map(|e| match e {
            EngineEvent::ParcelAppeared { key, .. } => Some(key.clone()),
            _ => None,
        })
        .collect()
}

/// Keys of ParcelRetired events, in emission order
pub fn retired_keys(events: &[EngineEvent]) -> Vec<String> {
    events
        .iter()
        .filter_map(|e| match e {
            EngineEvent::ParcelRetired { key, .. } => Some(key.clone()),
            _ => None,
        })
        .collect()
}

/// The last ActiveCountChanged value, if any
pub fn last_active_count(events: &[EngineEvent]) -> Option<usize> {
    events
        .iter()
        .filter_map(|e| match e {
            EngineEvent::ActiveCountChanged { count } => Some(*count),
            _ => None,
        })
        .last()
}
