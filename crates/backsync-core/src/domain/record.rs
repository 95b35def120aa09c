//! Request record: payload + queueing metadata.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{OutboundRequest, RecordId};

/// Bookkeeping that may change while a record waits in its queue.
///
/// Nothing else in a stored record is ever rewritten.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordMeta {
    /// Number of replay attempts that ended in a network failure.
    #[serde(default)]
    pub attempts: u32,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_attempt_at: Option<DateTime<Utc>>,
}

impl RecordMeta {
    pub fn record_failure(&self, at: DateTime<Utc>) -> Self {
        Self {
            attempts: self.attempts.saturating_add(1),
            last_attempt_at: Some(at),
        }
    }
}

/// One persisted request awaiting replay.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestRecord {
    id: RecordId,
    request: OutboundRequest,
    queued_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    tag: Option<String>,
    #[serde(default)]
    meta: RecordMeta,
}

impl RequestRecord {
    pub fn new(
        id: RecordId,
        request: OutboundRequest,
        queued_at: DateTime<Utc>,
        tag: Option<String>,
    ) -> Self {
        Self {
            id,
            request,
            queued_at,
            tag,
            meta: RecordMeta::default(),
        }
    }

    pub fn id(&self) -> RecordId {
        self.id
    }

    pub fn request(&self) -> &OutboundRequest {
        &self.request
    }

    pub fn queued_at(&self) -> DateTime<Utc> {
        self.queued_at
    }

    pub fn tag(&self) -> Option<&str> {
        self.tag.as_deref()
    }

    pub fn meta(&self) -> &RecordMeta {
        &self.meta
    }

    /// Age in milliseconds at `now` (negative if the clock went backwards).
    pub fn age_ms(&self, now: DateTime<Utc>) -> i64 {
        (now - self.queued_at).num_milliseconds()
    }

    /// Same record with new metadata. Payload fields are carried over as-is.
    pub(crate) fn with_meta(&self, meta: RecordMeta) -> Self {
        Self {
            meta,
            ..self.clone()
        }
    }
}
