//! ReplayManager - キューの再送ループ
//!
//! # フロー（replay_all）
//! 1. Registry から生きているキューを引く（キャッシュしない）
//! 2. replay ロックを取る（取れなければ何もしない = coalesce）
//! 3. スナップショットを古い順に処理
//!    - 期限切れ: 削除（ネットワークなし）して次へ
//!    - 成功（status 問わず）: 削除 → on_request_success
//!    - ネットワーク失敗: attempts を記録 → on_request_failure → そこで停止
//! 4. on_replay_success(summary)
//!
//! ネットワーク失敗で止まるのは順序保証のため。後続を先に送ると、
//! 順序依存の書き込みが入れ替わったり二重送信になったりする。

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::domain::{
    FailedReplay, QueueEvent, RecordId, ReplayOutcome, ReplaySummary, RequestRecord, SyncError,
};
use crate::ports::{NetworkClient, ReplayCallbacks};
use crate::queue::PersistedQueue;
use crate::registry::QueueRegistry;

pub struct ReplayManager {
    registry: Arc<QueueRegistry>,
    client: Arc<dyn NetworkClient>,
    callbacks: Arc<dyn ReplayCallbacks>,
}

/// What happened to one record inside a pass.
enum Step {
    Expired,
    Replayed { status: u16 },
    Failed(String),
}

impl ReplayManager {
    pub fn new(
        registry: Arc<QueueRegistry>,
        client: Arc<dyn NetworkClient>,
        callbacks: Arc<dyn ReplayCallbacks>,
    ) -> Self {
        Self {
            registry,
            client,
            callbacks,
        }
    }

    fn resolve(&self, queue_name: &str) -> Result<Arc<PersistedQueue>, SyncError> {
        self.registry
            .get(queue_name)
            .ok_or_else(|| SyncError::UnknownQueue(queue_name.to_string()))
    }

    /// Replay every record of `queue_name` in insertion order.
    ///
    /// Network failures end up in the summary; only storage and lookup
    /// errors are returned as `Err`.
    pub async fn replay_all(&self, queue_name: &str) -> Result<ReplaySummary, SyncError> {
        let queue = self.resolve(queue_name)?;
        let Some(_pass) = queue.try_begin_replay() else {
            debug!(queue = queue_name, "replay already running; trigger coalesced");
            return Ok(ReplaySummary::coalesced(queue_name));
        };

        let records = queue.get_all().await?;
        let total = records.len();
        let limit = queue.config().max_replays_per_pass;
        let mut summary = ReplaySummary::new(queue_name);
        debug!(queue = queue_name, total, "replay pass started");

        for (index, record) in records.iter().enumerate() {
            if limit.is_some_and(|limit| summary.replayed >= limit) {
                summary.remaining = total - index;
                debug!(queue = queue_name, remaining = summary.remaining, "replay limit reached");
                break;
            }

            match self.replay_record(&queue, record).await? {
                Step::Expired => summary.expired += 1,
                Step::Replayed { .. } => summary.replayed += 1,
                Step::Failed(error) => {
                    summary.remaining = total - index;
                    summary.failed = Some(FailedReplay {
                        id: record.id(),
                        error,
                    });
                    break;
                }
            }
        }

        info!(
            queue = queue_name,
            replayed = summary.replayed,
            expired = summary.expired,
            remaining = summary.remaining,
            failed = summary.failed.is_some(),
            "replay pass finished"
        );
        self.callbacks.on_replay_success(queue_name, &summary).await;
        queue.emit(QueueEvent::PassCompleted {
            summary: summary.clone(),
        });
        Ok(summary)
    }

    /// Replay one record out of order, e.g. for a user-driven retry.
    ///
    /// Waits for a running pass on the same queue to finish first.
    pub async fn replay_one(
        &self,
        queue_name: &str,
        id: RecordId,
    ) -> Result<ReplayOutcome, SyncError> {
        let queue = self.resolve(queue_name)?;
        let _pass = queue.begin_replay().await;

        let record = queue.get(id).await?.ok_or_else(|| SyncError::RecordNotFound {
            queue: queue_name.to_string(),
            id,
        })?;

        let outcome = match self.replay_record(&queue, &record).await? {
            Step::Expired => ReplayOutcome::Expired,
            Step::Replayed { status } => ReplayOutcome::Replayed { status },
            Step::Failed(error) => ReplayOutcome::Failed { error },
        };
        Ok(outcome)
    }

    /// Expire, send or fail a single record. Caller holds the replay lock.
    async fn replay_record(
        &self,
        queue: &PersistedQueue,
        record: &RequestRecord,
    ) -> Result<Step, SyncError> {
        let id = record.id();
        let name = queue.name();

        if queue.config().is_expired(record, queue.now()) {
            queue.delete_by_id(id).await?;
            info!(queue = name, %id, age_ms = record.age_ms(queue.now()), "record expired");
            queue.emit(QueueEvent::RequestExpired {
                queue: name.to_string(),
                id,
            });
            return Ok(Step::Expired);
        }

        match self.client.send(record.request()).await {
            Ok(response) => {
                queue.delete_by_id(id).await?;
                debug!(queue = name, %id, status = response.status, "record replayed");
                self.callbacks.on_request_success(record, &response).await;
                queue.emit(QueueEvent::RequestReplayed {
                    queue: name.to_string(),
                    id,
                    status: response.status,
                });
                Ok(Step::Replayed {
                    status: response.status,
                })
            }
            Err(error) => {
                let meta = record.meta().record_failure(queue.now());
                let attempts = meta.attempts;
                match queue.update_by_id(id, meta).await {
                    // 別経路で削除済みなら記録するものはない
                    Ok(_) | Err(SyncError::RecordNotFound { .. }) => {}
                    Err(e) => return Err(e),
                }
                warn!(queue = name, %id, attempts, %error, "replay failed; record kept");
                self.callbacks.on_request_failure(record, &error).await;
                queue.emit(QueueEvent::ReplayFailed {
                    queue: name.to_string(),
                    id,
                    error: error.to_string(),
                });
                Ok(Step::Failed(error.to_string()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::QueueConfig;
    use crate::test_support::{Harness, RecordingCallbacks, ScriptedClient, get};
    use chrono::Duration;

    const URL_A: &str = "https://api.example.com/a";
    const URL_B: &str = "https://api.example.com/b";

    #[tokio::test]
    async fn online_replay_drains_queue_in_order() {
        let h = Harness::new();
        let q = h.queue("Q", QueueConfig::with_max_age_ms(6000));
        q.push(get("a"), None).await.unwrap();
        q.push(get("b"), None).await.unwrap();
        let client = ScriptedClient::online();
        let callbacks = RecordingCallbacks::new();
        let manager = h.manager(client.clone(), callbacks.clone());

        let summary = manager.replay_all("Q").await.unwrap();

        assert_eq!(summary.replayed, 2);
        assert_eq!(summary.expired, 0);
        assert_eq!(summary.remaining, 0);
        assert!(summary.failed.is_none());
        assert!(summary.is_drained());
        assert!(q.is_empty().await.unwrap());
        assert_eq!(client.calls(), vec![URL_A, URL_B]);
        assert_eq!(
            callbacks.log(),
            vec![
                format!("success {URL_A} 200"),
                format!("success {URL_B} 200"),
                "pass Q".to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn offline_replay_keeps_record_with_original_id() {
        let h = Harness::new();
        let q = h.queue("Q", QueueConfig::with_max_age_ms(6000));
        let id = q.push(get("a"), None).await.unwrap();
        let callbacks = RecordingCallbacks::new();
        let manager = h.manager(ScriptedClient::offline(), callbacks.clone());

        let summary = manager.replay_all("Q").await.unwrap();

        assert_eq!(summary.replayed, 0);
        assert_eq!(summary.remaining, 1);
        assert_eq!(summary.failed.as_ref().map(|f| f.id), Some(id));
        let all = q.get_all().await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].id(), id);
        assert_eq!(all[0].meta().attempts, 1);
        assert_eq!(
            callbacks.log(),
            vec![
                format!("failure {URL_A} host unreachable: offline"),
                "pass Q".to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn aged_record_expires_without_network_call() {
        let h = Harness::new();
        let q = h.queue("Q", QueueConfig::with_max_age_ms(6000));
        q.push(get("a"), None).await.unwrap();
        h.clock.advance(Duration::milliseconds(10_000));
        let client = ScriptedClient::online();
        let callbacks = RecordingCallbacks::new();
        let manager = h.manager(client.clone(), callbacks.clone());

        let summary = manager.replay_all("Q").await.unwrap();

        assert_eq!(summary.expired, 1);
        assert_eq!(summary.replayed, 0);
        assert_eq!(summary.remaining, 0);
        assert!(client.calls().is_empty());
        assert!(q.is_empty().await.unwrap());
        assert_eq!(callbacks.log(), vec!["pass Q".to_string()]);
    }

    #[tokio::test]
    async fn failure_stops_pass_and_leaves_later_records_untouched() {
        let h = Harness::new();
        let q = h.queue("Q", QueueConfig::default());
        let a = q.push(get("a"), None).await.unwrap();
        let b = q.push(get("b"), None).await.unwrap();
        let client = ScriptedClient::online();
        client.fail_url(URL_A);
        let manager = h.manager(client.clone(), RecordingCallbacks::new());

        let summary = manager.replay_all("Q").await.unwrap();

        assert_eq!(client.calls(), vec![URL_A]);
        assert_eq!(summary.remaining, 2);
        assert_eq!(summary.replayed, 0);
        let all = q.get_all().await.unwrap();
        assert_eq!(all.iter().map(RequestRecord::id).collect::<Vec<_>>(), vec![a, b]);
        assert_eq!(all[1].meta().attempts, 0);
    }

    #[tokio::test]
    async fn expired_records_do_not_stop_the_pass() {
        let h = Harness::new();
        let q = h.queue("Q", QueueConfig::with_max_age_ms(6000));
        q.push(get("old"), None).await.unwrap();
        h.clock.advance(Duration::milliseconds(7000));
        q.push(get("a"), None).await.unwrap();
        let client = ScriptedClient::online();
        let manager = h.manager(client.clone(), RecordingCallbacks::new());

        let summary = manager.replay_all("Q").await.unwrap();

        assert_eq!((summary.expired, summary.replayed, summary.remaining), (1, 1, 0));
        assert_eq!(client.calls(), vec![URL_A]);
    }

    #[tokio::test]
    async fn error_status_still_counts_as_replayed() {
        let h = Harness::new();
        let q = h.queue("Q", QueueConfig::default());
        q.push(get("a"), None).await.unwrap();
        let client = ScriptedClient::online();
        client.set_status(500);
        let callbacks = RecordingCallbacks::new();
        let manager = h.manager(client, callbacks.clone());

        let summary = manager.replay_all("Q").await.unwrap();

        assert_eq!(summary.replayed, 1);
        assert!(q.is_empty().await.unwrap());
        assert_eq!(callbacks.log()[0], format!("success {URL_A} 500"));
    }

    #[tokio::test]
    async fn replay_limit_bounds_one_pass() {
        let h = Harness::new();
        let q = h.queue("Q", QueueConfig::default().replay_limit(1));
        q.push(get("a"), None).await.unwrap();
        q.push(get("b"), None).await.unwrap();
        let client = ScriptedClient::online();
        let manager = h.manager(client.clone(), RecordingCallbacks::new());

        let first = manager.replay_all("Q").await.unwrap();
        assert_eq!((first.replayed, first.remaining), (1, 1));
        assert!(first.failed.is_none());

        let second = manager.replay_all("Q").await.unwrap();
        assert_eq!((second.replayed, second.remaining), (1, 0));
        assert_eq!(client.calls(), vec![URL_A, URL_B]);
    }

    #[tokio::test]
    async fn retry_after_reconnect_keeps_order() {
        let h = Harness::new();
        let q = h.queue("Q", QueueConfig::default());
        q.push(get("a"), None).await.unwrap();
        q.push(get("b"), None).await.unwrap();
        let client = ScriptedClient::offline();
        let manager = h.manager(client.clone(), RecordingCallbacks::new());

        manager.replay_all("Q").await.unwrap();
        client.set_online(true);
        let summary = manager.replay_all("Q").await.unwrap();

        assert_eq!(summary.replayed, 2);
        assert_eq!(client.calls(), vec![URL_A, URL_A, URL_B]);
    }

    #[tokio::test]
    async fn unknown_queue_is_an_error() {
        let h = Harness::new();
        let manager = h.manager(ScriptedClient::online(), RecordingCallbacks::new());
        let err = manager.replay_all("nope").await.unwrap_err();
        assert!(matches!(err, SyncError::UnknownQueue(name) if name == "nope"));
    }

    #[tokio::test]
    async fn storage_read_failure_aborts_pass() {
        let h = Harness::new();
        let q = h.queue("Q", QueueConfig::default());
        q.push(get("a"), None).await.unwrap();
        h.storage.fail_reads(true);
        let client = ScriptedClient::online();
        let callbacks = RecordingCallbacks::new();
        let manager = h.manager(client.clone(), callbacks.clone());

        let err = manager.replay_all("Q").await.unwrap_err();

        assert!(matches!(err, SyncError::StorageReadFailed { .. }));
        assert!(client.calls().is_empty());
        assert!(callbacks.summaries().is_empty());
        assert!(!q.is_replaying());
    }

    #[tokio::test]
    async fn storage_delete_failure_aborts_and_keeps_record() {
        let h = Harness::new();
        let q = h.queue("Q", QueueConfig::default());
        q.push(get("a"), None).await.unwrap();
        q.push(get("b"), None).await.unwrap();
        h.storage.fail_deletes(true);
        let client = ScriptedClient::online();
        let manager = h.manager(client.clone(), RecordingCallbacks::new());

        let err = manager.replay_all("Q").await.unwrap_err();

        assert!(matches!(err, SyncError::StorageWriteFailed { .. }));
        assert_eq!(client.calls(), vec![URL_A]);
        h.storage.fail_deletes(false);
        assert_eq!(q.len().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn overlapping_trigger_is_coalesced() {
        let h = Harness::new();
        let q = h.queue("Q", QueueConfig::default());
        q.push(get("a"), None).await.unwrap();
        let client = ScriptedClient::online();
        client.hold_sends(true);
        let manager = h.manager(client.clone(), RecordingCallbacks::new());

        let running = tokio::spawn({
            let manager = manager.clone();
            async move { manager.replay_all("Q").await }
        });
        client.entered.notified().await;

        let second = manager.replay_all("Q").await.unwrap();
        assert!(second.coalesced);
        assert_eq!(second.replayed, 0);

        client.release.notify_one();
        let first = running.await.unwrap().unwrap();
        assert_eq!(first.replayed, 1);
        assert_eq!(client.calls(), vec![URL_A]);
    }

    #[tokio::test]
    async fn push_during_pass_is_left_for_next_pass() {
        let h = Harness::new();
        let q = h.queue("Q", QueueConfig::default());
        q.push(get("a"), None).await.unwrap();
        let client = ScriptedClient::online();
        client.hold_sends(true);
        let manager = h.manager(client.clone(), RecordingCallbacks::new());

        let running = tokio::spawn({
            let manager = manager.clone();
            async move { manager.replay_all("Q").await }
        });
        client.entered.notified().await;
        q.push(get("b"), None).await.unwrap();
        client.hold_sends(false);
        client.release.notify_one();

        let first = running.await.unwrap().unwrap();
        assert_eq!((first.replayed, first.remaining), (1, 0));
        assert_eq!(q.len().await.unwrap(), 1);

        let second = manager.replay_all("Q").await.unwrap();
        assert_eq!(second.replayed, 1);
        assert_eq!(client.calls(), vec![URL_A, URL_B]);
    }

    #[tokio::test]
    async fn replay_one_targets_a_single_record() {
        let h = Harness::new();
        let q = h.queue("Q", QueueConfig::default());
        let a = q.push(get("a"), None).await.unwrap();
        let b = q.push(get("b"), None).await.unwrap();
        let client = ScriptedClient::online();
        client.set_status(201);
        let callbacks = RecordingCallbacks::new();
        let manager = h.manager(client.clone(), callbacks.clone());

        let outcome = manager.replay_one("Q", b).await.unwrap();

        assert_eq!(outcome, ReplayOutcome::Replayed { status: 201 });
        assert_eq!(client.calls(), vec![URL_B]);
        let remaining: Vec<_> = q.get_all().await.unwrap().iter().map(RequestRecord::id).collect();
        assert_eq!(remaining, vec![a]);
        assert!(callbacks.summaries().is_empty());
    }

    #[tokio::test]
    async fn replay_one_reports_failure_expiry_and_missing() {
        let h = Harness::new();
        let q = h.queue("Q", QueueConfig::with_max_age_ms(6000));
        let old = q.push(get("old"), None).await.unwrap();
        h.clock.advance(Duration::milliseconds(7000));
        let fresh = q.push(get("a"), None).await.unwrap();
        let client = ScriptedClient::offline();
        let manager = h.manager(client.clone(), RecordingCallbacks::new());

        assert_eq!(manager.replay_one("Q", old).await.unwrap(), ReplayOutcome::Expired);
        assert!(matches!(
            manager.replay_one("Q", fresh).await.unwrap(),
            ReplayOutcome::Failed { .. }
        ));
        assert_eq!(q.get(fresh).await.unwrap().unwrap().meta().attempts, 1);

        let err = manager.replay_one("Q", old).await.unwrap_err();
        assert!(matches!(err, SyncError::RecordNotFound { id, .. } if id == old));
        assert_eq!(client.calls(), vec![URL_A]);
    }

    #[tokio::test]
    async fn events_follow_the_pass() {
        let h = Harness::new();
        let mut rx = h.events.subscribe();
        let q = h.queue("Q", QueueConfig::with_max_age_ms(6000));
        let old = q.push(get("old"), None).await.unwrap();
        h.clock.advance(Duration::milliseconds(7000));
        let a = q.push(get("a"), None).await.unwrap();
        let manager = h.manager(ScriptedClient::online(), RecordingCallbacks::new());

        manager.replay_all("Q").await.unwrap();

        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        assert_eq!(events.len(), 5);
        assert_eq!(events[2], QueueEvent::RequestExpired { queue: "Q".into(), id: old });
        assert_eq!(
            events[3],
            QueueEvent::RequestReplayed { queue: "Q".into(), id: a, status: 200 }
        );
        assert!(matches!(&events[4], QueueEvent::PassCompleted { summary } if summary.replayed == 1));
    }
}
