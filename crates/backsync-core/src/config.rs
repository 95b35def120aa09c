//! Settings - TOML の設定ファイル
//!
//! ```toml
//! storage_dir = "/var/lib/backsync"
//! log_filter = "backsync=debug"
//!
//! [probe]
//! url = "https://api.example.com/health"
//! interval_ms = 5000
//!
//! [queues.orders]
//! max_age_ms = 6000
//! ```
//!
//! 環境変数 `BACKSYNC_STORAGE_DIR` は `storage_dir` を上書きする。

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::domain::QueueConfig;

pub const STORAGE_DIR_ENV: &str = "BACKSYNC_STORAGE_DIR";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub storage_dir: PathBuf,
    pub log_filter: String,
    pub probe: ProbeSettings,
    pub queues: BTreeMap<String, QueueConfig>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            storage_dir: PathBuf::from(".backsync"),
            log_filter: "info".to_string(),
            probe: ProbeSettings::default(),
            queues: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProbeSettings {
    /// Endpoint polled to detect connectivity. `None` disables probing.
    pub url: Option<String>,
    pub interval_ms: u64,
}

impl Default for ProbeSettings {
    fn default() -> Self {
        Self {
            url: None,
            interval_ms: 5_000,
        }
    }
}

impl Settings {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(path, &text)
    }

    fn parse(path: &Path, text: &str) -> Result<Self, ConfigError> {
        toml::from_str(text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Settings from `path`, or defaults when the file is missing or broken.
    /// Environment overrides are applied either way.
    pub fn load_or_default(path: &Path) -> Self {
        let settings = if path.exists() {
            match Self::load(path) {
                Ok(settings) => {
                    info!(path = %path.display(), queues = settings.queues.len(), "settings loaded");
                    settings
                }
                Err(e) => {
                    warn!(error = %e, "falling back to default settings");
                    Self::default()
                }
            }
        } else {
            Self::default()
        };
        settings.with_env_overrides(|key| std::env::var(key).ok())
    }

    pub fn with_env_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(dir) = lookup(STORAGE_DIR_ENV).filter(|d| !d.is_empty()) {
            self.storage_dir = PathBuf::from(dir);
        }
        self
    }
}
