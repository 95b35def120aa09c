//! Errors - エラー型と分類
//!
//! # 伝播ポリシー
//! - Storage 系: 呼び出し元へそのまま返す（キューは最後の正常状態のまま）
//! - Network 系: replay 中は ReplaySummary / callback に吸収し、`replay_all` の外へは投げない
//! - RecordNotFound: delete では no-op、`replay_one` では報告のみ

use thiserror::Error;

use super::RecordId;
use crate::ports::StorageError;

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("storage write failed for queue={queue}: {source}")]
    StorageWriteFailed {
        queue: String,
        #[source]
        source: StorageError,
    },

    #[error("storage read failed for queue={queue}: {source}")]
    StorageReadFailed {
        queue: String,
        #[source]
        source: StorageError,
    },

    #[error("network unavailable: {0}")]
    NetworkUnavailable(String),

    #[error("record {id} not found in queue={queue}")]
    RecordNotFound { queue: String, id: RecordId },

    #[error("queue={queue} misconfigured: {reason}")]
    QueueMisconfigured { queue: String, reason: String },

    #[error("queue={0} is not registered")]
    UnknownQueue(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

impl SyncError {
    pub(crate) fn write(queue: &str, source: StorageError) -> Self {
        Self::StorageWriteFailed {
            queue: queue.to_string(),
            source,
        }
    }

    pub(crate) fn read(queue: &str, source: StorageError) -> Self {
        Self::StorageReadFailed {
            queue: queue.to_string(),
            source,
        }
    }
}
