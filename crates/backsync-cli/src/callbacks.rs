use async_trait::async_trait;
use backsync_core::domain::{ReplaySummary, RequestRecord};
use backsync_core::ports::{NetworkError, NetworkResponse, ReplayCallbacks};
use tracing::{info, warn};

/// Writes every replay lifecycle step to the log.
pub struct LoggingCallbacks;

#[async_trait]
impl ReplayCallbacks for LoggingCallbacks {
    async fn on_request_success(&self, record: &RequestRecord, response: &NetworkResponse) {
        info!(id = %record.id(), url = %record.request().url, status = response.status, "replayed");
    }

    async fn on_request_failure(&self, record: &RequestRecord, error: &NetworkError) {
        warn!(id = %record.id(), url = %record.request().url, error = %error, "still offline");
    }

    async fn on_replay_success(&self, queue: &str, summary: &ReplaySummary) {
        info!(
            queue,
            replayed = summary.replayed,
            expired = summary.expired,
            remaining = summary.remaining,
            "replay pass finished"
        );
    }
}
