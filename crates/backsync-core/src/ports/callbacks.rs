//! ReplayCallbacks - replay のライフサイクル通知
//!
//! 全メソッドにデフォルト（何もしない）実装があるので、
//! 必要なものだけ override すればよい。
//!
//! callback は replay ループ内で await される。遅い callback は
//! そのキューの進行だけを遅らせ、他のキューには影響しない。

use async_trait::async_trait;

use crate::domain::{ReplaySummary, RequestRecord};
use crate::ports::{NetworkError, NetworkResponse};

#[async_trait]
pub trait ReplayCallbacks: Send + Sync {
    /// A record was re-sent and a response came back; it has been deleted.
    async fn on_request_success(&self, _record: &RequestRecord, _response: &NetworkResponse) {}

    /// A record could not be re-sent; it stays queued.
    async fn on_request_failure(&self, _record: &RequestRecord, _error: &NetworkError) {}

    /// A `replay_all` pass finished (drained or stopped early).
    async fn on_replay_success(&self, _queue: &str, _summary: &ReplaySummary) {}
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NoopCallbacks;

impl ReplayCallbacks for NoopCallbacks {}
