//! backsync-core
//!
//! Durable queue for HTTP requests that failed while offline, replayed in
//! order once connectivity returns.
//!
//! # モジュール構成
//! - **domain**: ドメインモデル（ids, request, record, config, summary, events, errors）
//! - **ports**: 抽象化レイヤー（StorageBackend, NetworkClient, Clock, IdGenerator, ReplayCallbacks, EventSink）
//! - **impls**: 実装（InMemoryStorage, FileStorage, BroadcastEventSink）
//! - **queue**: PersistedQueue（1 つの名前付きキューの永続化と FIFO 順序）
//! - **registry**: QueueRegistry（名前 → キューの索引）
//! - **app**: ReplayManager, SyncCoordinator, SyncAppBuilder
//! - **config**: TOML 設定

pub mod domain;
pub mod ports;
pub mod impls;
pub mod queue;
pub mod registry;
pub mod app;
pub mod config;

#[cfg(test)]
mod test_support;

pub use app::{BuildError, ReplayManager, SyncApp, SyncAppBuilder, SyncCoordinator};
pub use domain::{OutboundRequest, QueueConfig, RecordId, RequestRecord, SyncError};
pub use queue::PersistedQueue;
pub use registry::QueueRegistry;
