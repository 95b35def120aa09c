//! Ports - 抽象化レイヤー
//!
//! このモジュールは Hexagonal Architecture の「ポート」を定義します。
//! 各 trait は外部の協力者（ストレージ、ネットワーク、時刻、通知）への
//! インターフェースを提供し、実装の詳細を隠蔽します。
//!
//! # 設計原則
//! - ストレージは注入される（エンジン自体は実装しない）
//! - ネットワークレベルの失敗だけが replay を止める
//! - 時刻と ID はテストで差し替え可能

pub mod callbacks;
pub mod clock;
pub mod connectivity;
pub mod event_sink;
pub mod id_generator;
pub mod network;
pub mod storage;

// 主要な trait を再エクスポート
pub use self::callbacks::{NoopCallbacks, ReplayCallbacks};
pub use self::clock::{Clock, FixedClock, SystemClock};
pub use self::connectivity::ConnectivitySignal;
pub use self::event_sink::{EventSink, NoopEventSink};
pub use self::id_generator::{IdGenerator, UlidGenerator};
pub use self::network::{NetworkClient, NetworkError, NetworkResponse};
pub use self::storage::{StorageBackend, StorageError, StoredEntry};
