//! FileStorage - namespace ごとに JSON ファイル 1 つの開発用ストレージ
//!
//! # 学習ポイント
//! - 一時ファイルへ書いてから rename（途中でクラッシュしても旧内容か新内容のどちらか）
//! - 一時ファイルは書き込みごとに一意（同じディレクトリに作るので rename は atomic）
//! - read-modify-write は namespace ごとの lock ファイルで排他（別プロセスの writer とも直列化）
//! - 同期 I/O は spawn_blocking に逃がす
//! - namespace 名は base64url でファイル名にする（衝突しない・パス区切りを含まない）
//!
//! 小さなキュー向けの実装で、書き込みのたびにファイル全体を書き直します。

use std::fs::{self, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD};
use fs2::FileExt;
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use tokio::sync::Mutex;

use crate::ports::{StorageBackend, StorageError, StoredEntry};

const FILE_VERSION: u16 = 1;

#[derive(Debug, Serialize, Deserialize)]
struct NamespaceFile {
    version: u16,
    namespace: String,
    entries: Vec<FileEntry>,
}

#[derive(Debug, Serialize, Deserialize)]
struct FileEntry {
    key: String,
    value: String,
}

pub struct FileStorage {
    root: PathBuf,
    /// 同一プロセス内の read-modify-write を直列化
    write_lock: Arc<Mutex<()>>,
}

impl FileStorage {
    /// Use `root` as the storage directory, creating it if needed.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        Ok(Self {
            root,
            write_lock: Arc::new(Mutex::new(())),
        })
    }

    fn path_for(&self, namespace: &str) -> PathBuf {
        let encoded = URL_SAFE_NO_PAD.encode(namespace.as_bytes());
        self.root.join(format!("ns-{encoded}.json"))
    }

    fn lock_path_for(&self, namespace: &str) -> PathBuf {
        self.path_for(namespace).with_extension("lock")
    }

    async fn blocking<T, F>(f: F) -> Result<T, StorageError>
    where
        T: Send + 'static,
        F: FnOnce() -> Result<T, StorageError> + Send + 'static,
    {
        tokio::task::spawn_blocking(f)
            .await
            .map_err(|e| StorageError::Unavailable(format!("storage task failed: {e}")))?
    }

    /// Read-modify-write one namespace file.
    ///
    /// Holds the in-process write lock and an exclusive advisory lock on the
    /// namespace's lock file, so writers in other processes see every commit.
    async fn modify<F>(&self, namespace: &str, f: F) -> Result<(), StorageError>
    where
        F: FnOnce(&mut Vec<StoredEntry>) -> bool + Send + 'static,
    {
        let _guard = self.write_lock.lock().await;
        let path = self.path_for(namespace);
        let lock_path = self.lock_path_for(namespace);
        let namespace = namespace.to_string();
        Self::blocking(move || {
            let lock = OpenOptions::new()
                .create(true)
                .truncate(false)
                .write(true)
                .open(&lock_path)?;
            FileExt::lock_exclusive(&lock)?;
            let result = read_entries(&path).and_then(|mut entries| {
                if f(&mut entries) {
                    write_entries(&path, &namespace, &entries)?;
                }
                Ok(())
            });
            // drop でも解放されるが、エラーは握りつぶさない
            FileExt::unlock(&lock)?;
            result
        })
        .await
    }
}

fn read_entries(path: &Path) -> Result<Vec<StoredEntry>, StorageError> {
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    };
    let file: NamespaceFile = serde_json::from_slice(&bytes)
        .map_err(|e| StorageError::Corrupt(format!("{}: {e}", path.display())))?;
    if file.version != FILE_VERSION {
        return Err(StorageError::Corrupt(format!(
            "{}: unsupported version {}",
            path.display(),
            file.version
        )));
    }
    file.entries
        .into_iter()
        .map(|entry| {
            let value = STANDARD
                .decode(entry.value)
                .map_err(|e| StorageError::Corrupt(format!("key {}: {e}", entry.key)))?;
            Ok(StoredEntry {
                key: entry.key,
                value,
            })
        })
        .collect()
}

fn write_entries(path: &Path, namespace: &str, entries: &[StoredEntry]) -> Result<(), StorageError> {
    let file = NamespaceFile {
        version: FILE_VERSION,
        namespace: namespace.to_string(),
        entries: entries
            .iter()
            .map(|entry| FileEntry {
                key: entry.key.clone(),
                value: STANDARD.encode(&entry.value),
            })
            .collect(),
    };
    let json = serde_json::to_vec(&file).map_err(|e| StorageError::Corrupt(e.to_string()))?;

    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let tmp = NamedTempFile::new_in(dir)?;
    {
        let mut writer = BufWriter::new(tmp.as_file());
        writer.write_all(&json)?;
        writer.flush()?;
    }
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| StorageError::Io(e.error))?;
    Ok(())
}

#[async_trait]
impl StorageBackend for FileStorage {
    async fn put(&self, namespace: &str, key: &str, value: Vec<u8>) -> Result<(), StorageError> {
        let key = key.to_string();
        self.modify(namespace, move |entries| {
            match entries.iter_mut().find(|entry| entry.key == key) {
                Some(existing) => existing.value = value,
                None => entries.push(StoredEntry { key, value }),
            }
            true
        })
        .await
    }

    async fn get_all(&self, namespace: &str) -> Result<Vec<StoredEntry>, StorageError> {
        let path = self.path_for(namespace);
        Self::blocking(move || read_entries(&path)).await
    }

    async fn delete(&self, namespace: &str, key: &str) -> Result<(), StorageError> {
        let key = key.to_string();
        self.modify(namespace, move |entries| {
            let before = entries.len();
            entries.retain(|entry| entry.key != key);
            entries.len() != before
        })
        .await
    }
}
