//! App - アプリケーション層
//!
//! ports とキューを組み合わせて replay のロジックを実装します。
//!
//! # 主要コンポーネント
//! - **SyncAppBuilder / SyncApp**: 構築とワイヤリング、利用者向けの表面
//! - **ReplayManager**: 1 キュー分の replay pass（expire / send / delete / 失敗で停止）
//! - **SyncCoordinator**: 接続復帰シグナルで attach 済みキューを逐次 replay

pub mod builder;
pub mod coordinator;
pub mod replay;

pub use self::builder::{BuildError, SyncApp, SyncAppBuilder};
pub use self::coordinator::{CoordinatorHandle, QueueReplayResult, SyncCoordinator};
pub use self::replay::ReplayManager;
