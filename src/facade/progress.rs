//! Favorites and practice progress

use crate::error::Result;
use crate::models::{PracticeSession, SongProgress};
use crate::store::{keys, snapshot::entry, SnapshotStore};
use crate::sync::Clock;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;

pub struct ProgressFacade {
    local: Arc<SnapshotStore>,
    clock: Arc<dyn Clock>,
}

impl ProgressFacade {
    pub fn new(local: Arc<SnapshotStore>, clock: Arc<dyn Clock>) -> Self {
        Self { local, clock }
    }

    pub fn favorites(&self) -> Result<Vec<String>> {
        self.local.get(keys::FAVORITES)
    }

    pub fn is_favorite(&self, song_id: &str) -> Result<bool> {
        Ok(self.favorites()?.iter().any(|id| id == song_id))
    }

    /// Add or remove a favorite; returns whether the song is now a favorite
    pub async fn toggle_favorite(&self, song_id: &str) -> Result<bool> {
        let writer = self.local.write().await;
        let mut favorites: Vec<String> = writer.get(keys::FAVORITES)?;

        let now_favorite = if favorites.iter().any(|id| id == song_id) {
            favorites.retain(|id| id != song_id);
            false
        } else {
            favorites.push(song_id.to_string());
            true
        };

        writer.commit(vec![entry(keys::FAVORITES, &favorites)?])?;
        Ok(now_favorite)
    }

    pub fn song_progress(&self, song_id: &str) -> Result<Option<SongProgress>> {
        let mut progress: BTreeMap<String, SongProgress> = self.local.get(keys::SONG_PROGRESS)?;
        Ok(progress.remove(song_id))
    }

    /// All recorded sessions, newest first
    pub fn practice_sessions(&self) -> Result<Vec<PracticeSession>> {
        self.local.get(keys::PRACTICE_SESSIONS)
    }

    /// Record a session against a song. The song's progress record and the
    /// session history are written together.
    pub async fn record_practice_session(
        &self,
        song_id: &str,
        duration_secs: u64,
        completed: bool,
    ) -> Result<SongProgress> {
        let now = self.clock.now();
        let session = PracticeSession::new(song_id, now, duration_secs, completed);

        let writer = self.local.write().await;
        let mut progress: BTreeMap<String, SongProgress> = writer.get(keys::SONG_PROGRESS)?;
        let mut sessions: Vec<PracticeSession> = writer.get(keys::PRACTICE_SESSIONS)?;

        let record = progress
            .entry(song_id.to_string())
            .or_insert_with(|| SongProgress::new(song_id, now));
        record.record(session.clone());
        let updated = record.clone();

        sessions.insert(0, session);

        writer.commit(vec![
            entry(keys::SONG_PROGRESS, &progress)?,
            entry(keys::PRACTICE_SESSIONS, &sessions)?,
        ])?;

        debug!(
            "Recorded {}s session for {} (mastery {})",
            duration_secs, song_id, updated.mastery_level
        );
        Ok(updated)
    }
}
