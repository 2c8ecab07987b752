//! Local backups
//!
//! Point-in-time copies of the user's data as pretty-printed JSON files.
//! Restoring replaces every entity at once; the sync marker is left alone so
//! the next pass merges the restored data with the remote copy.

use crate::error::{Result, SyncError};
use crate::models::{CustomChord, PracticeSession, Preferences, SongProgress};
use crate::store::{keys, snapshot::entry, SnapshotStore};
use crate::sync::Clock;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

const FILE_PREFIX: &str = "fretsync-backup-";

/// Backup file contents
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackupData {
    #[serde(default)]
    pub preferences: Preferences,
    #[serde(default)]
    pub favorites: Vec<String>,
    #[serde(default)]
    pub song_progress: BTreeMap<String, SongProgress>,
    #[serde(default)]
    pub custom_chords: Vec<CustomChord>,
    #[serde(default)]
    pub practice_sessions: Vec<PracticeSession>,
    /// Unix ms when the backup was taken
    pub timestamp: i64,
    /// App version that wrote the backup
    pub version: String,
}

/// A backup on disk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupInfo {
    pub path: PathBuf,
    pub timestamp: i64,
    /// Bytes
    pub size: u64,
}

pub struct BackupManager {
    local: Arc<SnapshotStore>,
    dir: PathBuf,
    app_version: String,
    clock: Arc<dyn Clock>,
}

impl BackupManager {
    pub fn new(
        local: Arc<SnapshotStore>,
        dir: impl Into<PathBuf>,
        app_version: impl Into<String>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            local,
            dir: dir.into(),
            app_version: app_version.into(),
            clock,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Write a backup of the current local data; returns its path
    pub fn create(&self) -> Result<PathBuf> {
        std::fs::create_dir_all(&self.dir)?;

        let snapshot = self.local.read()?;
        let now = self.clock.now();
        let data = BackupData {
            preferences: snapshot.preferences,
            favorites: snapshot.favorites,
            song_progress: snapshot.song_progress,
            custom_chords: snapshot.custom_chords,
            practice_sessions: snapshot.practice_sessions,
            timestamp: now.timestamp_millis(),
            version: self.app_version.clone(),
        };

        let filename = format!("{}{}.json", FILE_PREFIX, now.format("%Y-%m-%dT%H-%M-%S-%3fZ"));
        let path = self.dir.join(filename);
        std::fs::write(&path, serde_json::to_string_pretty(&data)?)?;

        info!("Created backup {}", path.display());
        Ok(path)
    }

    /// Backups in the backup directory, newest first
    pub fn list(&self) -> Result<Vec<BackupInfo>> {
        if !self.dir.exists() {
            return Ok(Vec::new());
        }

        let mut backups = Vec::new();
        for dir_entry in std::fs::read_dir(&self.dir)? {
            let path = dir_entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }

            match read_backup(&path) {
                Ok(data) => backups.push(BackupInfo {
                    size: std::fs::metadata(&path).map(|m| m.len()).unwrap_or(0),
                    timestamp: data.timestamp,
                    path,
                }),
                Err(e) => warn!("Skipping unreadable backup {}: {}", path.display(), e),
            }
        }

        backups.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        Ok(backups)
    }

    /// Replace local data with the contents of a backup
    pub async fn restore(&self, path: &Path) -> Result<()> {
        let data = read_backup(path)?;

        if !is_compatible(&self.app_version, &data.version) {
            return Err(SyncError::IncompatibleBackup {
                found: data.version,
                expected: self.app_version.clone(),
            });
        }

        let writer = self.local.write().await;
        writer.commit(vec![
            entry(keys::PREFERENCES, &data.preferences)?,
            entry(keys::FAVORITES, &data.favorites)?,
            entry(keys::SONG_PROGRESS, &data.song_progress)?,
            entry(keys::CUSTOM_CHORDS, &data.custom_chords)?,
            entry(keys::PRACTICE_SESSIONS, &data.practice_sessions)?,
        ])?;

        info!("Restored backup {}", path.display());
        Ok(())
    }

    pub fn delete(&self, path: &Path) -> Result<()> {
        if !path.exists() {
            return Err(SyncError::NotFound(path.display().to_string()));
        }
        std::fs::remove_file(path)?;
        info!("Deleted backup {}", path.display());
        Ok(())
    }
}

fn read_backup(path: &Path) -> Result<BackupData> {
    let content = std::fs::read_to_string(path)?;
    serde_json::from_str(&content)
        .map_err(|e| SyncError::Backup(format!("{}: {}", path.display(), e)))
}

/// Same major version
fn is_compatible(current: &str, backup: &str) -> bool {
    let major = |v: &str| v.split('.').next().and_then(|m| m.trim().parse::<u64>().ok());
    match (major(current), major(backup)) {
        (Some(a), Some(b)) => a == b,
        _ => false,
    }
}
