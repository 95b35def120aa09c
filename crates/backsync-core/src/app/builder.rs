//! SyncAppBuilder - 協力者のワイヤリングと SyncApp の構築
//!
//! # Fail-fast 設計
//! - storage と network client は必須（無ければ BuildError）
//! - `.queue()` で宣言したキューは build() 時に登録・attach される
//!   （不正な設定はここで QueueMisconfigured になる）

use std::sync::Arc;

use crate::domain::{
    OutboundRequest, QueueConfig, RecordId, ReplayOutcome, ReplaySummary, RequestRecord,
    SyncError,
};
use crate::ports::{
    Clock, ConnectivitySignal, EventSink, IdGenerator, NetworkClient, NoopCallbacks,
    NoopEventSink, ReplayCallbacks, StorageBackend, SystemClock, UlidGenerator,
};
use crate::queue::{QueueContext, QueueStatus};
use crate::registry::QueueRegistry;

use super::coordinator::{CoordinatorHandle, QueueReplayResult, SyncCoordinator};
use super::ReplayManager;

#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("a storage backend is required")]
    MissingStorage,

    #[error("a network client is required")]
    MissingNetworkClient,

    #[error(transparent)]
    Queue(#[from] SyncError),
}

/// # 使用例
/// ```ignore
/// let app = SyncAppBuilder::new()
///     .storage(Arc::new(InMemoryStorage::new()))
///     .network_client(client)
///     .callbacks(Arc::new(MyCallbacks))
///     .queue("orders", QueueConfig::with_max_age_ms(6000))
///     .build()?;
/// ```
pub struct SyncAppBuilder {
    storage: Option<Arc<dyn StorageBackend>>,
    client: Option<Arc<dyn NetworkClient>>,
    callbacks: Arc<dyn ReplayCallbacks>,
    clock: Arc<dyn Clock>,
    ids: Option<Arc<dyn IdGenerator>>,
    events: Arc<dyn EventSink>,
    queues: Vec<(String, QueueConfig)>,
}

impl SyncAppBuilder {
    pub fn new() -> Self {
        Self {
            storage: None,
            client: None,
            callbacks: Arc::new(NoopCallbacks),
            clock: Arc::new(SystemClock),
            ids: None,
            events: Arc::new(NoopEventSink),
            queues: Vec::new(),
        }
    }

    pub fn storage(mut self, storage: Arc<dyn StorageBackend>) -> Self {
        self.storage = Some(storage);
        self
    }

    pub fn network_client(mut self, client: Arc<dyn NetworkClient>) -> Self {
        self.client = Some(client);
        self
    }

    pub fn callbacks(mut self, callbacks: Arc<dyn ReplayCallbacks>) -> Self {
        self.callbacks = callbacks;
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Defaults to a `UlidGenerator` on the configured clock.
    pub fn id_generator(mut self, ids: Arc<dyn IdGenerator>) -> Self {
        self.ids = Some(ids);
        self
    }

    pub fn events(mut self, events: Arc<dyn EventSink>) -> Self {
        self.events = events;
        self
    }

    /// Register and attach `name` at build time.
    pub fn queue(mut self, name: impl Into<String>, config: QueueConfig) -> Self {
        self.queues.push((name.into(), config));
        self
    }

    pub fn build(self) -> Result<SyncApp, BuildError> {
        let storage = self.storage.ok_or(BuildError::MissingStorage)?;
        let client = self.client.ok_or(BuildError::MissingNetworkClient)?;
        let ids = self
            .ids
            .unwrap_or_else(|| Arc::new(UlidGenerator::new(Arc::clone(&self.clock))));

        let registry = Arc::new(QueueRegistry::new(QueueContext {
            storage,
            ids,
            clock: self.clock,
            events: self.events,
        }));
        let manager = Arc::new(ReplayManager::new(
            Arc::clone(&registry),
            client,
            self.callbacks,
        ));
        let app = SyncApp {
            registry,
            manager,
            coordinator: Arc::new(SyncCoordinator::new()),
        };
        for (name, config) in self.queues {
            app.attach(&name, config)?;
        }
        Ok(app)
    }
}

impl Default for SyncAppBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// The assembled system: one registry, one replay manager, one coordinator.
pub struct SyncApp {
    registry: Arc<QueueRegistry>,
    manager: Arc<ReplayManager>,
    coordinator: Arc<SyncCoordinator>,
}

impl SyncApp {
    pub fn registry(&self) -> &Arc<QueueRegistry> {
        &self.registry
    }

    pub fn manager(&self) -> &Arc<ReplayManager> {
        &self.manager
    }

    pub fn coordinator(&self) -> &Arc<SyncCoordinator> {
        &self.coordinator
    }

    /// Queue a failed request. Creates the queue on first use.
    pub async fn push(
        &self,
        queue: &str,
        request: OutboundRequest,
        config: QueueConfig,
    ) -> Result<RecordId, SyncError> {
        self.registry
            .get_or_create(queue, config)?
            .push(request, None)
            .await
    }

    pub async fn push_tagged(
        &self,
        queue: &str,
        request: OutboundRequest,
        tag: impl Into<String>,
        config: QueueConfig,
    ) -> Result<RecordId, SyncError> {
        self.registry
            .get_or_create(queue, config)?
            .push(request, Some(tag.into()))
            .await
    }

    pub async fn list(&self, queue: &str) -> Result<Vec<RequestRecord>, SyncError> {
        self.registry
            .get(queue)
            .ok_or_else(|| SyncError::UnknownQueue(queue.to_string()))?
            .get_all()
            .await
    }

    pub async fn status(&self, queue: &str) -> Result<QueueStatus, SyncError> {
        self.registry
            .get(queue)
            .ok_or_else(|| SyncError::UnknownQueue(queue.to_string()))?
            .status()
            .await
    }

    pub async fn replay_all(&self, queue: &str) -> Result<ReplaySummary, SyncError> {
        self.manager.replay_all(queue).await
    }

    pub async fn replay_one(&self, queue: &str, id: RecordId) -> Result<ReplayOutcome, SyncError> {
        self.manager.replay_one(queue, id).await
    }

    /// Create (if needed) and attach `queue` to the coordinator.
    pub fn attach(&self, queue: &str, config: QueueConfig) -> Result<(), SyncError> {
        self.registry.get_or_create(queue, config)?;
        self.coordinator.attach(queue, Arc::clone(&self.manager));
        Ok(())
    }

    pub fn detach(&self, queue: &str) -> bool {
        self.coordinator.detach(queue)
    }

    pub async fn connectivity_restored(&self) -> Vec<QueueReplayResult> {
        self.coordinator.on_connectivity_restored().await
    }

    /// Start listening for connectivity signals; returns the signal to fire
    /// and the handle to stop the listener.
    pub fn spawn_coordinator(&self) -> (ConnectivitySignal, CoordinatorHandle) {
        let (signal, rx) = ConnectivitySignal::channel();
        let handle = Arc::clone(&self.coordinator).spawn(rx);
        (signal, handle)
    }
}
