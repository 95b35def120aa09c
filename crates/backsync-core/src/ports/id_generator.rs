//! IdGenerator port - ID 生成の抽象化
//!
//! テスト容易性のために trait として抽象化しています。
//!
//! # 実装
//! - **UlidGenerator**: 単調増加 ULID（本番用）

use std::sync::{Arc, Mutex};
use std::time::SystemTime;

use ulid::{Generator, Ulid};

use crate::domain::RecordId;
use crate::ports::Clock;

/// IdGenerator はレコード ID を生成
///
/// # Thread Safety
/// - `Send + Sync` を要求（複数タスクから push される）
pub trait IdGenerator: Send + Sync {
    fn generate_record_id(&self) -> RecordId;
}

/// UlidGenerator は Clock の時刻を使う単調増加 ULID 生成器
///
/// 同じミリ秒内でもランダム部をインクリメントするので、
/// 生成順と ID 順が常に一致します。FixedClock でも一意です。
pub struct UlidGenerator {
    clock: Arc<dyn Clock>,
    inner: Mutex<Generator>,
}

impl UlidGenerator {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            inner: Mutex::new(Generator::new()),
        }
    }
}

impl IdGenerator for UlidGenerator {
    fn generate_record_id(&self) -> RecordId {
        let at = SystemTime::from(self.clock.now());
        let mut generator = self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        // ランダム部が溢れた場合（同一ミリ秒で 2^80 回）は単調性を諦めて新規生成
        let ulid = generator
            .generate_from_datetime(at)
            .unwrap_or_else(|_| Ulid::from_datetime(at));
        RecordId::from_ulid(ulid)
    }
}
