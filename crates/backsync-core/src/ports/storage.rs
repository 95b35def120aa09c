//! StorageBackend port - 永続 key/value ストレージ
//!
//! StorageBackend は namespace ごとに挿入順を保つ mapping を提供します。
//! キュー名がそのまま namespace になるため、キュー間でレコードが混ざることはありません。
//!
//! # 実装
//! - **InMemoryStorage**: テスト・開発用
//! - **FileStorage**: namespace ごとに JSON ファイル 1 つ（開発用）

use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("corrupt entry: {0}")]
    Corrupt(String),

    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

/// One key/value pair as returned by `get_all`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredEntry {
    pub key: String,
    pub value: Vec<u8>,
}

/// StorageBackend は durable な順序付き mapping
///
/// # 契約
/// - `put`: 新しい key は末尾に追加、既存 key は位置を変えずに値だけ置き換える
/// - `get_all`: 挿入順で返す
/// - `delete`: 存在しない key は no-op
/// - 戻った時点で永続化済みであること
#[async_trait]
pub trait StorageBackend: Send + Sync {
    async fn put(&self, namespace: &str, key: &str, value: Vec<u8>) -> Result<(), StorageError>;

    async fn get_all(&self, namespace: &str) -> Result<Vec<StoredEntry>, StorageError>;

    async fn delete(&self, namespace: &str, key: &str) -> Result<(), StorageError>;

    /// Point lookup. The default scans `get_all`; adapters with an index should override it.
    async fn get(&self, namespace: &str, key: &str) -> Result<Option<Vec<u8>>, StorageError> {
        Ok(self
            .get_all(namespace)
            .await?
            .into_iter()
            .find(|entry| entry.key == key)
            .map(|entry| entry.value))
    }
}
