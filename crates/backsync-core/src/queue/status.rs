use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Point-in-time view of one queue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueStatus {
    pub name: String,
    pub pending: usize,
    /// Records the next pass would purge without replaying.
    pub expired: usize,
    pub oldest_queued_at: Option<DateTime<Utc>>,
    /// Highest failure count among pending records.
    pub max_attempts: u32,
}
