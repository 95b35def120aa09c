//! Results of replay passes.

use serde::{Deserialize, Serialize};

use super::{RecordId, SyncError};

/// The record that stopped a pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailedReplay {
    pub id: RecordId,
    pub error: String,
}

/// Outcome of one `replay_all` pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplaySummary {
    pub queue: String,
    pub replayed: usize,
    pub expired: usize,
    /// Records of the pass snapshot still in the queue afterwards.
    pub remaining: usize,
    pub failed: Option<FailedReplay>,
    /// Another pass for the same queue was already running; this one did nothing.
    pub coalesced: bool,
}

impl ReplaySummary {
    pub fn new(queue: impl Into<String>) -> Self {
        Self {
            queue: queue.into(),
            replayed: 0,
            expired: 0,
            remaining: 0,
            failed: None,
            coalesced: false,
        }
    }

    pub fn coalesced(queue: impl Into<String>) -> Self {
        Self {
            coalesced: true,
            ..Self::new(queue)
        }
    }

    /// Pass ran to the end of its snapshot without a network failure.
    pub fn is_drained(&self) -> bool {
        !self.coalesced && self.failed.is_none() && self.remaining == 0
    }
}

/// Outcome of replaying a single record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ReplayOutcome {
    /// Response received (any status); record deleted.
    Replayed { status: u16 },
    /// Too old; deleted without a network call.
    Expired,
    /// Network-level failure; record kept.
    Failed { error: String },
}

impl ReplayOutcome {
    /// `Failed` becomes `NetworkUnavailable`; the others report the HTTP status if any.
    pub fn into_result(self) -> Result<Option<u16>, SyncError> {
        match self {
            Self::Replayed { status } => Ok(Some(status)),
            Self::Expired => Ok(None),
            Self::Failed { error } => Err(SyncError::NetworkUnavailable(error)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn coalesced_summary_is_not_drained() {
        let summary = ReplaySummary::coalesced("Q");
        assert!(summary.coalesced);
        assert!(!summary.is_drained());
        assert!(ReplaySummary::new("Q").is_drained());
    }

    #[test]
    fn failed_outcome_maps_to_network_unavailable() {
        let err = ReplayOutcome::Failed {
            error: "offline".into(),
        }
        .into_result()
        .unwrap_err();
        assert!(matches!(err, SyncError::NetworkUnavailable(msg) if msg == "offline"));
        assert_eq!(
            ReplayOutcome::Replayed { status: 503 }.into_result().unwrap(),
            Some(503)
        );
    }
}
