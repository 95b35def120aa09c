//! Shared test doubles.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicU16, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use tokio::sync::Notify;
use ulid::Ulid;

use crate::app::ReplayManager;
use crate::domain::{OutboundRequest, QueueConfig, RecordId, ReplaySummary, RequestRecord};
use crate::impls::{BroadcastEventSink, InMemoryStorage};
use crate::ports::{
    FixedClock, NetworkClient, NetworkError, NetworkResponse, ReplayCallbacks, StorageBackend,
    StorageError, StoredEntry, UlidGenerator,
};
use crate::queue::{PersistedQueue, QueueContext};
use crate::registry::QueueRegistry;

pub fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap()
}

pub fn get(path: &str) -> OutboundRequest {
    OutboundRequest::get(format!("https://api.example.com/{path}"))
}

/// InMemoryStorage with switchable failures.
#[derive(Default)]
pub struct FlakyStorage {
    pub inner: InMemoryStorage,
    fail_writes: AtomicBool,
    fail_reads: AtomicBool,
    fail_deletes: AtomicBool,
}

impl FlakyStorage {
    pub fn fail_writes(&self, on: bool) {
        self.fail_writes.store(on, Ordering::SeqCst);
    }

    pub fn fail_reads(&self, on: bool) {
        self.fail_reads.store(on, Ordering::SeqCst);
    }

    pub fn fail_deletes(&self, on: bool) {
        self.fail_deletes.store(on, Ordering::SeqCst);
    }

    fn check(flag: &AtomicBool, what: &str) -> Result<(), StorageError> {
        if flag.load(Ordering::SeqCst) {
            return Err(StorageError::Unavailable(format!("{what} disabled by test")));
        }
        Ok(())
    }
}

#[async_trait]
impl StorageBackend for FlakyStorage {
    async fn put(&self, namespace: &str, key: &str, value: Vec<u8>) -> Result<(), StorageError> {
        Self::check(&self.fail_writes, "put")?;
        self.inner.put(namespace, key, value).await
    }

    async fn get_all(&self, namespace: &str) -> Result<Vec<StoredEntry>, StorageError> {
        Self::check(&self.fail_reads, "get_all")?;
        self.inner.get_all(namespace).await
    }

    async fn delete(&self, namespace: &str, key: &str) -> Result<(), StorageError> {
        Self::check(&self.fail_deletes, "delete")?;
        self.inner.delete(namespace, key).await
    }

    async fn get(&self, namespace: &str, key: &str) -> Result<Option<Vec<u8>>, StorageError> {
        Self::check(&self.fail_reads, "get")?;
        self.inner.get(namespace, key).await
    }
}

/// NetworkClient that answers from a script and records every call.
pub struct ScriptedClient {
    online: AtomicBool,
    status: AtomicU16,
    failing_urls: Mutex<HashSet<String>>,
    calls: Mutex<Vec<String>>,
    hold: AtomicBool,
    pub entered: Notify,
    pub release: Notify,
}

impl ScriptedClient {
    pub fn online() -> Arc<Self> {
        Arc::new(Self {
            online: AtomicBool::new(true),
            status: AtomicU16::new(200),
            failing_urls: Mutex::new(HashSet::new()),
            calls: Mutex::new(Vec::new()),
            hold: AtomicBool::new(false),
            entered: Notify::new(),
            release: Notify::new(),
        })
    }

    pub fn offline() -> Arc<Self> {
        let client = Self::online();
        client.set_online(false);
        client
    }

    pub fn set_online(&self, on: bool) {
        self.online.store(on, Ordering::SeqCst);
    }

    pub fn set_status(&self, status: u16) {
        self.status.store(status, Ordering::SeqCst);
    }

    pub fn fail_url(&self, url: &str) {
        self.failing_urls.lock().unwrap().insert(url.to_string());
    }

    /// Make every send wait for `release` after signalling `entered`.
    pub fn hold_sends(&self, on: bool) {
        self.hold.store(on, Ordering::SeqCst);
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl NetworkClient for ScriptedClient {
    async fn send(&self, request: &OutboundRequest) -> Result<NetworkResponse, NetworkError> {
        self.calls.lock().unwrap().push(request.url.clone());
        if self.hold.load(Ordering::SeqCst) {
            self.entered.notify_one();
            self.release.notified().await;
        }
        if !self.online.load(Ordering::SeqCst) {
            return Err(NetworkError::Unreachable("offline".into()));
        }
        if self.failing_urls.lock().unwrap().contains(&request.url) {
            return Err(NetworkError::TimedOut);
        }
        Ok(NetworkResponse::with_status(self.status.load(Ordering::SeqCst)))
    }
}

/// Callbacks that write one line per invocation.
#[derive(Default)]
pub struct RecordingCallbacks {
    log: Mutex<Vec<String>>,
    summaries: Mutex<Vec<ReplaySummary>>,
}

impl RecordingCallbacks {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn log(&self) -> Vec<String> {
        self.log.lock().unwrap().clone()
    }

    pub fn summaries(&self) -> Vec<ReplaySummary> {
        self.summaries.lock().unwrap().clone()
    }
}

#[async_trait]
impl ReplayCallbacks for RecordingCallbacks {
    async fn on_request_success(&self, record: &RequestRecord, response: &NetworkResponse) {
        self.log
            .lock()
            .unwrap()
            .push(format!("success {} {}", record.request().url, response.status));
    }

    async fn on_request_failure(&self, record: &RequestRecord, error: &NetworkError) {
        self.log
            .lock()
            .unwrap()
            .push(format!("failure {} {error}", record.request().url));
    }

    async fn on_replay_success(&self, queue: &str, summary: &ReplaySummary) {
        self.log.lock().unwrap().push(format!("pass {queue}"));
        self.summaries.lock().unwrap().push(summary.clone());
    }
}

/// Registry wired to a FixedClock, a FlakyStorage and a broadcast sink.
pub struct Harness {
    pub storage: Arc<FlakyStorage>,
    pub clock: Arc<FixedClock>,
    pub events: Arc<BroadcastEventSink>,
    pub registry: Arc<QueueRegistry>,
}

impl Harness {
    pub fn new() -> Self {
        let storage = Arc::new(FlakyStorage::default());
        let clock = Arc::new(FixedClock::new(t0()));
        let events = Arc::new(BroadcastEventSink::new(64));
        let ctx = QueueContext {
            storage: storage.clone(),
            ids: Arc::new(UlidGenerator::new(clock.clone())),
            clock: clock.clone(),
            events: events.clone(),
        };
        Self {
            storage,
            clock,
            events,
            registry: Arc::new(QueueRegistry::new(ctx)),
        }
    }

    pub fn queue(&self, name: &str, config: QueueConfig) -> Arc<PersistedQueue> {
        self.registry.get_or_create(name, config).unwrap()
    }

    pub fn manager(
        &self,
        client: Arc<ScriptedClient>,
        callbacks: Arc<RecordingCallbacks>,
    ) -> Arc<ReplayManager> {
        Arc::new(ReplayManager::new(self.registry.clone(), client, callbacks))
    }

    pub fn other_id(&self) -> RecordId {
        RecordId::from_ulid(Ulid::new())
    }
}
