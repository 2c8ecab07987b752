//! Error types for fretsync

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SyncError {
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Remote error: {0}")]
    Remote(String),

    #[error("Remote request failed with status {status}: {message}")]
    RemoteStatus { status: u16, message: String },

    #[error("Authentication error: {0}")]
    Auth(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Backup error: {0}")]
    Backup(String),

    #[error("Incompatible backup version {found} (app version {expected})")]
    IncompatibleBackup { found: String, expected: String },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Config parse error: {0}")]
    TomlDe(#[from] toml::de::Error),

    #[error("Config write error: {0}")]
    TomlSer(#[from] toml::ser::Error),
}

impl SyncError {
    /// Whether a failed remote call is worth retrying.
    ///
    /// Client errors other than timeouts and rate limiting will fail the same
    /// way on the next attempt.
    pub fn is_transient(&self) -> bool {
        match self {
            SyncError::RemoteStatus { status, .. } => {
                *status >= 500 || *status == 408 || *status == 429
            }
            SyncError::Http(_) | SyncError::Remote(_) | SyncError::Io(_) => true,
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, SyncError>;
