//! InMemoryStorage - 開発・テスト用のストレージ
//!
//! # 実装詳細
//! - HashMap<String, Vec<StoredEntry>> で namespace ごとに挿入順を保持
//! - tokio Mutex で排他制御（ロックを持ったまま外部 await はしない）
//! - プロセス終了で消えるので durable ではない

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::ports::{StorageBackend, StorageError, StoredEntry};

#[derive(Debug, Default)]
pub struct InMemoryStorage {
    namespaces: Mutex<HashMap<String, Vec<StoredEntry>>>,
}

impl InMemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn namespaces(&self) -> Vec<String> {
        let guard = self.namespaces.lock().await;
        let mut names: Vec<String> = guard.keys().cloned().collect();
        names.sort();
        names
    }
}

#[async_trait]
impl StorageBackend for InMemoryStorage {
    async fn put(&self, namespace: &str, key: &str, value: Vec<u8>) -> Result<(), StorageError> {
        let mut guard = self.namespaces.lock().await;
        let entries = guard.entry(namespace.to_string()).or_default();
        match entries.iter_mut().find(|entry| entry.key == key) {
            Some(existing) => existing.value = value,
            None => entries.push(StoredEntry {
                key: key.to_string(),
                value,
            }),
        }
        Ok(())
    }

    async fn get_all(&self, namespace: &str) -> Result<Vec<StoredEntry>, StorageError> {
        let guard = self.namespaces.lock().await;
        Ok(guard.get(namespace).cloned().unwrap_or_default())
    }

    async fn delete(&self, namespace: &str, key: &str) -> Result<(), StorageError> {
        let mut guard = self.namespaces.lock().await;
        if let Some(entries) = guard.get_mut(namespace) {
            entries.retain(|entry| entry.key != key);
        }
        Ok(())
    }

    async fn get(&self, namespace: &str, key: &str) -> Result<Option<Vec<u8>>, StorageError> {
        let guard = self.namespaces.lock().await;
        Ok(guard
            .get(namespace)
            .and_then(|entries| entries.iter().find(|entry| entry.key == key))
            .map(|entry| entry.value.clone()))
    }
}
