//! Domain model (ids, requests, records, config, summaries, errors, events).

pub mod config;
pub mod errors;
pub mod events;
pub mod ids;
pub mod record;
pub mod request;
pub mod summary;

pub use self::config::{DEFAULT_MAX_AGE_MS, QueueConfig};
pub use self::errors::SyncError;
pub use self::events::QueueEvent;
pub use self::ids::RecordId;
pub use self::record::{RecordMeta, RequestRecord};
pub use self::request::{
    Credentials, HeaderList, OutboundRequest, RedirectPolicy, RequestMode, TransportOptions,
};
pub use self::summary::{FailedReplay, ReplayOutcome, ReplaySummary};
