//! BroadcastEventSink - QueueEvent を tokio broadcast channel に流す
//!
//! 受信側（UI、ログ、メトリクスなど）は `subscribe()` で購読する。
//! 受信者がいない・遅れている場合、イベントは捨てられる（replay は止めない）。

use tokio::sync::broadcast;

use crate::domain::QueueEvent;
use crate::ports::EventSink;

#[derive(Debug, Clone)]
pub struct BroadcastEventSink {
    tx: broadcast::Sender<QueueEvent>,
}

impl BroadcastEventSink {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<QueueEvent> {
        self.tx.subscribe()
    }
}

impl EventSink for BroadcastEventSink {
    fn emit(&self, event: QueueEvent) {
        // 受信者ゼロは正常
        let _ = self.tx.send(event);
    }
}
