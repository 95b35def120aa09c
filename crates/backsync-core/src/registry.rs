//! QueueRegistry - キュー名から PersistedQueue への索引
//!
//! # 設計原則
//! - 明示的に生成して所有者（SyncApp）が持つ（グローバルなシングルトンにしない）
//! - 1 つの名前に対して PersistedQueue は常に 1 つ（同じストレージ・同じ replay ロックを共有）
//! - 設定は先勝ち（後から違う設定で呼ばれても最初の設定を使い、warn を出す）

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tracing::{info, warn};

use crate::domain::{QueueConfig, SyncError};
use crate::queue::{PersistedQueue, QueueContext};

pub struct QueueRegistry {
    ctx: QueueContext,
    queues: Mutex<HashMap<String, Arc<PersistedQueue>>>,
}

impl QueueRegistry {
    pub fn new(ctx: QueueContext) -> Self {
        Self {
            ctx,
            queues: Mutex::new(HashMap::new()),
        }
    }

    /// Existing queue for `name`, or a new one built with `config`.
    ///
    /// The map lock is held across lookup and insert, so two racing callers
    /// always end up with the same `Arc`.
    pub fn get_or_create(
        &self,
        name: &str,
        config: QueueConfig,
    ) -> Result<Arc<PersistedQueue>, SyncError> {
        if name.trim().is_empty() {
            return Err(SyncError::QueueMisconfigured {
                queue: name.to_string(),
                reason: "queue name must not be empty".to_string(),
            });
        }
        config
            .validate()
            .map_err(|reason| SyncError::QueueMisconfigured {
                queue: name.to_string(),
                reason,
            })?;

        let mut queues = self.queues.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Some(existing) = queues.get(name) {
            if existing.config() != &config {
                warn!(
                    queue = name,
                    kept = ?existing.config(),
                    ignored = ?config,
                    "queue already registered with a different config; keeping the first"
                );
            }
            return Ok(Arc::clone(existing));
        }

        info!(queue = name, max_age_ms = config.max_age_ms, "queue registered");
        let queue = Arc::new(PersistedQueue::new(
            name.to_string(),
            config,
            self.ctx.clone(),
        ));
        queues.insert(name.to_string(), Arc::clone(&queue));
        Ok(queue)
    }

    pub fn get(&self, name: &str) -> Option<Arc<PersistedQueue>> {
        let queues = self.queues.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        queues.get(name).cloned()
    }

    /// Registered queue names, sorted.
    pub fn names(&self) -> Vec<String> {
        let queues = self.queues.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        let mut names: Vec<String> = queues.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.queues
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
