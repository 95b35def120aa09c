//! RecordCodec - RequestRecord とストレージ上のバイト列の相互変換
//!
//! # 形式
//! `{"v": 1, "record": { ... }}` の JSON。将来の形式変更は `v` で判別する。

use serde::{Deserialize, Serialize};

use crate::domain::RequestRecord;
use crate::ports::StorageError;

pub const CODEC_VERSION: u16 = 1;

#[derive(Serialize)]
struct EnvelopeRef<'a> {
    v: u16,
    record: &'a RequestRecord,
}

#[derive(Deserialize)]
struct Envelope {
    v: u16,
    record: RequestRecord,
}

pub fn encode(record: &RequestRecord) -> Result<Vec<u8>, StorageError> {
    serde_json::to_vec(&EnvelopeRef {
        v: CODEC_VERSION,
        record,
    })
    .map_err(|e| StorageError::Corrupt(format!("encode {}: {e}", record.id())))
}

/// `key` is only used to make errors point at the offending entry.
pub fn decode(key: &str, bytes: &[u8]) -> Result<RequestRecord, StorageError> {
    let envelope: Envelope = serde_json::from_slice(bytes)
        .map_err(|e| StorageError::Corrupt(format!("decode {key}: {e}")))?;
    if envelope.v != CODEC_VERSION {
        return Err(StorageError::Corrupt(format!(
            "decode {key}: unsupported record version {}",
            envelope.v
        )));
    }
    if envelope.record.id().storage_key() != key {
        return Err(StorageError::Corrupt(format!(
            "decode {key}: stored under a different id ({})",
            envelope.record.id()
        )));
    }
    Ok(envelope.record)
}
