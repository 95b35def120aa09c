//! RecordId - キュー内のレコード識別子
//!
//! ULID をラップした newtype です。
//!
//! ## ULID を使う理由
//! - **時刻でソート可能**: enqueue 順と ID 順が一致する（UlidGenerator は単調増加）
//! - **再利用されない**: 削除済み ID と衝突しない
//! - **文字列キー**: StorageBackend の key としてそのまま使える

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use ulid::Ulid;

/// Display で使うプレフィックス
const PREFIX: &str = "req-";

/// Identifier of a queued request record.
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RecordId(Ulid);

impl RecordId {
    pub fn from_ulid(ulid: Ulid) -> Self {
        Self(ulid)
    }

    pub fn as_ulid(&self) -> Ulid {
        self.0
    }

    /// Storage key (ULID の 26 文字表現、プレフィックスなし)
    pub fn storage_key(&self) -> String {
        self.0.to_string()
    }
}

impl From<Ulid> for RecordId {
    fn from(ulid: Ulid) -> Self {
        Self::from_ulid(ulid)
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{PREFIX}{}", self.0)
    }
}

/// `req-<ulid>` と素の `<ulid>` の両方を受け付ける
impl FromStr for RecordId {
    type Err = ulid::DecodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let raw = s.strip_prefix(PREFIX).unwrap_or(s);
        Ulid::from_string(raw).map(Self)
    }
}
