//! Queue module: persisted per-name request queue.
//!
//! A `PersistedQueue` never caches records; every read goes to the storage
//! backend so pushes made during a replay pass are always visible to the
//! next read.

pub mod codec;
mod status;

pub use status::QueueStatus;

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, MutexGuard};
use tracing::debug;

use crate::domain::{
    OutboundRequest, QueueConfig, QueueEvent, RecordId, RecordMeta, RequestRecord, SyncError,
};
use crate::ports::{Clock, EventSink, IdGenerator, StorageBackend};

/// Collaborators shared by every queue of a registry.
#[derive(Clone)]
pub struct QueueContext {
    pub storage: Arc<dyn StorageBackend>,
    pub ids: Arc<dyn IdGenerator>,
    pub clock: Arc<dyn Clock>,
    pub events: Arc<dyn EventSink>,
}

/// Durable, insertion-ordered queue of request records.
///
/// Design:
/// - The queue name is the storage namespace (hard isolation between queues).
/// - Payload fields are write-once; only `RecordMeta` is ever rewritten.
/// - `replay_lock` is held for the duration of a replay pass.
pub struct PersistedQueue {
    name: String,
    config: QueueConfig,
    ctx: QueueContext,
    replay_lock: Mutex<()>,
}

impl PersistedQueue {
    pub(crate) fn new(name: String, config: QueueConfig, ctx: QueueContext) -> Self {
        Self {
            name,
            config,
            ctx,
            replay_lock: Mutex::new(()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn config(&self) -> &QueueConfig {
        &self.config
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.ctx.clock.now()
    }

    /// Append a request at the tail and return its fresh id.
    pub async fn push(
        &self,
        request: OutboundRequest,
        tag: Option<String>,
    ) -> Result<RecordId, SyncError> {
        request.validate().map_err(SyncError::InvalidRequest)?;

        let id = self.ctx.ids.generate_record_id();
        let record = RequestRecord::new(id, request, self.now(), tag);
        self.write(&record).await?;

        debug!(queue = %self.name, %id, "request queued");
        self.emit(QueueEvent::RequestQueued {
            queue: self.name.clone(),
            id,
        });
        Ok(id)
    }

    /// All records, oldest first, as currently committed in storage.
    pub async fn get_all(&self) -> Result<Vec<RequestRecord>, SyncError> {
        let entries = self
            .ctx
            .storage
            .get_all(&self.name)
            .await
            .map_err(|e| SyncError::read(&self.name, e))?;
        entries
            .iter()
            .map(|entry| codec::decode(&entry.key, &entry.value))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| SyncError::read(&self.name, e))
    }

    pub async fn get(&self, id: RecordId) -> Result<Option<RequestRecord>, SyncError> {
        let key = id.storage_key();
        let bytes = self
            .ctx
            .storage
            .get(&self.name, &key)
            .await
            .map_err(|e| SyncError::read(&self.name, e))?;
        bytes
            .map(|bytes| codec::decode(&key, &bytes))
            .transpose()
            .map_err(|e| SyncError::read(&self.name, e))
    }

    /// Remove one record. Unknown ids are a no-op.
    pub async fn delete_by_id(&self, id: RecordId) -> Result<(), SyncError> {
        self.ctx
            .storage
            .delete(&self.name, &id.storage_key())
            .await
            .map_err(|e| SyncError::write(&self.name, e))
    }

    /// Rewrite a record's bookkeeping metadata in place.
    ///
    /// Only `RecordMeta` can be passed in, so payload fields cannot change.
    pub async fn update_by_id(
        &self,
        id: RecordId,
        meta: RecordMeta,
    ) -> Result<RequestRecord, SyncError> {
        let record = self.get(id).await?.ok_or_else(|| SyncError::RecordNotFound {
            queue: self.name.clone(),
            id,
        })?;
        let updated = record.with_meta(meta);
        self.write(&updated).await?;
        Ok(updated)
    }

    pub async fn len(&self) -> Result<usize, SyncError> {
        Ok(self.get_all().await?.len())
    }

    pub async fn is_empty(&self) -> Result<bool, SyncError> {
        Ok(self.len().await? == 0)
    }

    pub async fn status(&self) -> Result<QueueStatus, SyncError> {
        let records = self.get_all().await?;
        let now = self.now();
        Ok(QueueStatus {
            name: self.name.clone(),
            pending: records.len(),
            expired: records
                .iter()
                .filter(|record| self.config.is_expired(record, now))
                .count(),
            oldest_queued_at: records.iter().map(RequestRecord::queued_at).min(),
            max_attempts: records
                .iter()
                .map(|record| record.meta().attempts)
                .max()
                .unwrap_or(0),
        })
    }

    /// A pass is currently holding the replay lock.
    pub fn is_replaying(&self) -> bool {
        self.replay_lock.try_lock().is_err()
    }

    /// Claim the replay lock if it is free. `None` means a pass is already running.
    pub(crate) fn try_begin_replay(&self) -> Option<MutexGuard<'_, ()>> {
        self.replay_lock.try_lock().ok()
    }

    /// Wait for the replay lock.
    pub(crate) async fn begin_replay(&self) -> MutexGuard<'_, ()> {
        self.replay_lock.lock().await
    }

    pub(crate) fn emit(&self, event: QueueEvent) {
        self.ctx.events.emit(event);
    }

    async fn write(&self, record: &RequestRecord) -> Result<(), SyncError> {
        let bytes = codec::encode(record).map_err(|e| SyncError::write(&self.name, e))?;
        self.ctx
            .storage
            .put(&self.name, &record.id().storage_key(), bytes)
            .await
            .map_err(|e| SyncError::write(&self.name, e))
    }
}
