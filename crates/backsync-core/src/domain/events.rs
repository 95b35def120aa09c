//! Queue lifecycle events published through an `EventSink`.

use serde::{Deserialize, Serialize};

use super::{RecordId, ReplaySummary};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum QueueEvent {
    RequestQueued { queue: String, id: RecordId },
    RequestReplayed { queue: String, id: RecordId, status: u16 },
    RequestExpired { queue: String, id: RecordId },
    ReplayFailed { queue: String, id: RecordId, error: String },
    PassCompleted { summary: ReplaySummary },
}

impl QueueEvent {
    pub fn queue(&self) -> &str {
        match self {
            Self::RequestQueued { queue, .. }
            | Self::RequestReplayed { queue, .. }
            | Self::RequestExpired { queue, .. }
            | Self::ReplayFailed { queue, .. } => queue,
            Self::PassCompleted { summary } => &summary.queue,
        }
    }
}
