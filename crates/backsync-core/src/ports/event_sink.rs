//! EventSink port - キューイベントの外部通知
//!
//! # 実装
//! - NoopEventSink: 何もしない（デフォルト）
//! - BroadcastEventSink: tokio broadcast channel へ流す（impls）

use crate::domain::QueueEvent;

/// EventSink はキューのイベントを記録
///
/// emit は同期で、失敗しても replay には影響しない（受信者がいなければ捨てる）。
pub trait EventSink: Send + Sync {
    fn emit(&self, event: QueueEvent);
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NoopEventSink;

impl EventSink for NoopEventSink {
    fn emit(&self, _event: QueueEvent) {}
}
