//! SyncCoordinator - 接続復帰シグナルで attach 済みキューを replay
//!
//! # 方針
//! - キューは attach 順に **逐次** replay（再接続直後のリクエスト集中を避ける）
//! - 同じキューの重複トリガーは ReplayManager 側のロックで no-op になる
//! - 1 つのキューの失敗は後続キューを止めない
//!
//! # バックグラウンド実行
//! `spawn()` は ConnectivitySignal のチャネルを待つタスクを起動する。
//! `CoordinatorHandle` を通じて shutdown を要求できる（処理中の pass は最後まで走る）。

use std::sync::{Arc, Mutex};

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::ReplayManager;
use crate::domain::{ReplaySummary, SyncError};

struct Attachment {
    queue: String,
    manager: Arc<ReplayManager>,
}

/// Result of triggering one attached queue.
pub type QueueReplayResult = (String, Result<ReplaySummary, SyncError>);

#[derive(Default)]
pub struct SyncCoordinator {
    attached: Mutex<Vec<Attachment>>,
}

impl SyncCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    fn attachments(&self) -> std::sync::MutexGuard<'_, Vec<Attachment>> {
        self.attached
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Register `queue` for replay on connectivity. Re-attaching replaces the
    /// manager but keeps the queue's original position.
    pub fn attach(&self, queue: &str, manager: Arc<ReplayManager>) {
        let mut attached = self.attachments();
        match attached.iter_mut().find(|a| a.queue == queue) {
            Some(existing) => existing.manager = manager,
            None => {
                debug!(queue, "queue attached");
                attached.push(Attachment {
                    queue: queue.to_string(),
                    manager,
                });
            }
        }
    }

    /// Returns whether the queue was attached.
    pub fn detach(&self, queue: &str) -> bool {
        let mut attached = self.attachments();
        let before = attached.len();
        attached.retain(|a| a.queue != queue);
        attached.len() != before
    }

    /// Attached queue names in trigger order.
    pub fn attached(&self) -> Vec<String> {
        self.attachments().iter().map(|a| a.queue.clone()).collect()
    }

    /// Replay every attached queue, one after another.
    pub async fn on_connectivity_restored(&self) -> Vec<QueueReplayResult> {
        // ロックを持ったまま await しないよう先にコピー
        let targets: Vec<(String, Arc<ReplayManager>)> = self
            .attachments()
            .iter()
            .map(|a| (a.queue.clone(), Arc::clone(&a.manager)))
            .collect();

        info!(queues = targets.len(), "connectivity restored; replaying attached queues");
        let mut results = Vec::with_capacity(targets.len());
        for (queue, manager) in targets {
            let result = manager.replay_all(&queue).await;
            if let Err(e) = &result {
                warn!(queue = %queue, error = %e, "replay pass aborted");
            }
            results.push((queue, result));
        }
        results
    }

    /// Listen for connectivity signals in a background task.
    pub fn spawn(self: Arc<Self>, signals: mpsc::Receiver<()>) -> CoordinatorHandle {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let join = tokio::spawn(signal_loop(self, signals, shutdown_rx));
        CoordinatorHandle { shutdown_tx, join }
    }
}

/// Handle to a spawned coordinator loop.
/// - `request_shutdown()` で新しいシグナルの受付を止める
/// - `shutdown_and_join()` で終了まで待つ
pub struct CoordinatorHandle {
    shutdown_tx: watch::Sender<bool>,
    join: JoinHandle<()>,
}

impl CoordinatorHandle {
    pub fn request_shutdown(&self) {
        // receiver が既に drop 済みでも問題ない
        let _ = self.shutdown_tx.send(true);
    }

    pub async fn shutdown_and_join(self) {
        self.request_shutdown();
        let _ = self.join.await;
    }
}

async fn signal_loop(
    coordinator: Arc<SyncCoordinator>,
    mut signals: mpsc::Receiver<()>,
    mut shutdown_rx: watch::Receiver<bool>,
) {
    loop {
        if *shutdown_rx.borrow() {
            break;
        }

        let signal = tokio::select! {
            changed = shutdown_rx.changed() => {
                if changed.is_err() {
                    break;
                }
                continue;
            }
            signal = signals.recv() => signal,
        };

        let Some(()) = signal else {
            debug!("connectivity signal source closed");
            break;
        };

        // 溜まっている通知は 1 回分にまとめる
        while signals.try_recv().is_ok() {}

        coordinator.on_connectivity_restored().await;
    }
    debug!("coordinator loop stopped");
}
