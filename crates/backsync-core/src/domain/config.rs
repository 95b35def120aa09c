//! QueueConfig - キューごとの設定
//!
//! # 設計原則
//! - 最初に登録された設定が勝つ（QueueRegistry 側で保証）
//! - 不正な値は登録時に QueueMisconfigured として拒否する

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::RequestRecord;

/// 24 時間
pub const DEFAULT_MAX_AGE_MS: i64 = 24 * 60 * 60 * 1000;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueConfig {
    /// Records older than this (relative to `queued_at`) are purged without replay.
    #[serde(default = "default_max_age_ms")]
    pub max_age_ms: i64,

    /// Upper bound on successful replays in one pass. `None` = unbounded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_replays_per_pass: Option<usize>,
}

fn default_max_age_ms() -> i64 {
    DEFAULT_MAX_AGE_MS
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            max_age_ms: DEFAULT_MAX_AGE_MS,
            max_replays_per_pass: None,
        }
    }
}

impl QueueConfig {
    pub fn with_max_age_ms(max_age_ms: i64) -> Self {
        Self {
            max_age_ms,
            ..Self::default()
        }
    }

    pub fn replay_limit(mut self, limit: usize) -> Self {
        self.max_replays_per_pass = Some(limit);
        self
    }

    /// Returns the reason the config is unusable, if any.
    pub fn validate(&self) -> Result<(), String> {
        if self.max_age_ms < 0 {
            return Err(format!("max_age_ms must be >= 0, got {}", self.max_age_ms));
        }
        if self.max_replays_per_pass == Some(0) {
            return Err("max_replays_per_pass must be at least 1".to_string());
        }
        Ok(())
    }

    /// 期限切れ判定: `now - queued_at > max_age`（境界ちょうどはまだ有効）
    pub fn is_expired(&self, record: &RequestRecord, now: DateTime<Utc>) -> bool {
        record.age_ms(now) > self.max_age_ms
    }
}
