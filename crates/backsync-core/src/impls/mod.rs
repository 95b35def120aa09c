//! Impls - ports の実装（開発用・テスト用）
//!
//! # 含まれる実装
//! - **InMemoryStorage**: テスト用の StorageBackend
//! - **FileStorage**: 開発用のファイルベース StorageBackend
//! - **BroadcastEventSink**: tokio broadcast による EventSink
//!
//! 本番のストレージエンジンやネットワーククライアントは、
//! それぞれの ports を実装して注入します。

pub mod broadcast_sink;
pub mod file_storage;
pub mod inmem_storage;

pub use self::broadcast_sink::BroadcastEventSink;
pub use self::file_storage::FileStorage;
pub use self::inmem_storage::InMemoryStorage;
