//! Navigator configuration

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use compass_session::DEFAULT_STORAGE_KEY;

use crate::error::CoreError;
use crate::Result;

pub const DEFAULT_LOG_FILTER: &str = "info";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// SQLite file backing the durable store; `None` keeps state in memory
    pub database_path: Option<PathBuf>,
    /// Partition inside the durable store. A new browser session gets a new scope.
    pub session_scope: String,
    /// Key the persisted document is written under
    pub storage_key: String,
    /// How long the restore reaction stays blocked after a rewrite
    pub restore_settle_ms: u64,
    /// Tracing filter used when `RUST_LOG` is unset
    pub log_filter: String,
}

impl Config {
    pub fn new(data_dir: PathBuf) -> Self {
        Self {
            database_path: Some(data_dir.join("compass.db")),
            ..Self::in_memory()
        }
    }

    pub fn in_memory() -> Self {
        Self {
            database_path: None,
            session_scope: uuid::Uuid::new_v4().to_string(),
            storage_key: DEFAULT_STORAGE_KEY.to_string(),
            restore_settle_ms: 100,
            log_filter: DEFAULT_LOG_FILTER.to_string(),
        }
    }

    /// Parse a JSON document; missing fields take their defaults
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn with_session_scope(mut self, scope: impl Into<String>) -> Self {
        self.session_scope = scope.into();
        self
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.restore_settle_ms)
    }

    pub fn validate(&self) -> Result<()> {
        if self.storage_key.trim().is_empty() {
            return Err(CoreError::Config("storage_key must not be empty".to_string()));
        }
        if self.session_scope.trim().is_empty() {
            return Err(CoreError::Config("session_scope must not be empty".to_string()));
        }
        Ok(())
    }

    pub fn data_dir() -> PathBuf {
        dirs::data_local_dir()
            .map(|d| d.join("Compass"))
            .unwrap_or_else(|| PathBuf::from(".compass"))
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new(Self::data_dir())
    }
}

mod dirs {
    use std::env;
    use std::path::PathBuf;

    /// Per-user application data root for the current platform
    pub fn data_local_dir() -> Option<PathBuf> {
        if cfg!(target_os = "windows") {
            env::var_os("LOCALAPPDATA").map(PathBuf::from)
        } else if cfg!(target_os = "macos") {
            home().map(|h| h.join("Library/Application Support"))
        } else {
            env::var_os("XDG_DATA_HOME")
                .map(PathBuf::from)
                .or_else(|| home().map(|h| h.join(".local/share")))
        }
    }

    fn home() -> Option<PathBuf> {
        env::var_os("HOME").map(PathBuf::from)
    }
}
