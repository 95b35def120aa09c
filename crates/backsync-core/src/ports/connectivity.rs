//! ConnectivitySignal - 「接続が戻ったかもしれない」通知
//!
//! 外部のイベントソース（OS の通知、probe、手動ボタンなど）が `notify()` を呼ぶ。
//! チャネル容量は 1 なので、処理待ちの通知がある間の追加通知は自然に 1 つへまとまる。

use tokio::sync::mpsc;

#[derive(Debug, Clone)]
pub struct ConnectivitySignal {
    tx: mpsc::Sender<()>,
}

impl ConnectivitySignal {
    /// Create a signal and the receiver a `SyncCoordinator` listens on.
    pub fn channel() -> (Self, mpsc::Receiver<()>) {
        let (tx, rx) = mpsc::channel(1);
        (Self { tx }, rx)
    }

    /// Fire the signal. Never blocks; duplicate firings are dropped.
    ///
    /// Returns `false` once the listening coordinator has gone away.
    pub fn notify(&self) -> bool {
        match self.tx.try_send(()) {
            Ok(()) | Err(mpsc::error::TrySendError::Full(())) => true,
            Err(mpsc::error::TrySendError::Closed(())) => false,
        }
    }
}
