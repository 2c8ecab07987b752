//! Configuration management for fretsync
//!
//! Configuration can be loaded from:
//! - Default values
//! - Config file (~/.config/fretsync/config.toml)

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Sync scheduling and retry policy
    pub sync: SyncConfig,
    /// Remote sync endpoint
    pub remote: RemoteConfig,
    /// Local data storage
    pub storage: StorageConfig,
    /// Local backup files
    pub backup: BackupConfig,
    /// Reference backend
    pub server: ServerConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Whether automatic sync is allowed at all
    pub enabled: bool,
    /// Seconds between automatic sync passes
    pub interval_secs: u64,
    /// Run one pass immediately when auto sync starts
    pub sync_on_start: bool,
    /// Extra attempts for a failed remote call
    pub max_retries: u32,
    /// Base backoff between attempts, doubled on each retry
    pub retry_backoff_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoteConfig {
    /// Backend base URL; the bundle lives at `{base_url}/sync`
    pub base_url: String,
    /// Request timeout in seconds
    pub timeout_secs: u64,
    /// Environment variable holding the bearer token
    pub token_env: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// JSON document holding the local key/value store
    pub data_path: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BackupConfig {
    /// Directory for backup files
    pub backup_dir: PathBuf,
    /// Version stamped into backups; restore requires the same major version
    pub app_version: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host to bind to
    pub host: String,
    /// Port to listen on
    pub port: u16,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_secs: 5 * 60,
            sync_on_start: true,
            max_retries: 2,
            retry_backoff_ms: 500,
        }
    }
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8430".to_string(),
            timeout_secs: 30,
            token_env: "FRETSYNC_TOKEN".to_string(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        let data_dir = dirs::data_dir().unwrap_or_else(|| PathBuf::from("."));
        Self {
            data_path: data_dir.join("fretsync").join("store.json"),
        }
    }
}

impl Default for BackupConfig {
    fn default() -> Self {
        let data_dir = dirs::data_dir().unwrap_or_else(|| PathBuf::from("."));
        Self {
            backup_dir: data_dir.join("fretsync").join("backups"),
            app_version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8430,
        }
    }
}

impl Config {
    /// Get default configuration file path
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("fretsync")
            .join("config.toml")
    }

    /// Load configuration from file, falling back to defaults when it is absent
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = path.map(PathBuf::from).unwrap_or_else(Self::default_path);

        if path.exists() {
            let content = std::fs::read_to_string(&path)?;
            let config: Config = toml::from_str(&content)?;
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    /// Save configuration to file
    pub fn save(&self, path: Option<&Path>) -> Result<()> {
        let path = path.map(PathBuf::from).unwrap_or_else(Self::default_path);

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(&path, content)?;

        Ok(())
    }
}

impl SyncConfig {
    /// Interval between automatic passes
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    /// Backoff before retry number `attempt` (0-based)
    pub fn retry_backoff(&self, attempt: u32) -> Duration {
        let factor = 1u64.checked_shl(attempt).unwrap_or(u64::MAX);
        Duration::from_millis(self.retry_backoff_ms.saturating_mul(factor))
    }
}

impl RemoteConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}
