//! Data models for practice-data sync
//!
//! These structures are the unit of synchronization between the device and
//! the remote store. Field names follow the camelCase JSON the mobile client
//! and the backend exchange.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Flat mapping of setting name to value
pub type Preferences = Map<String, Value>;

/// The complete set of synchronizable user data at one point in time
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncSnapshot {
    #[serde(default, deserialize_with = "null_as_default")]
    pub preferences: Preferences,

    /// Song ids; semantically a set
    #[serde(default, deserialize_with = "null_as_default")]
    pub favorites: Vec<String>,

    #[serde(default, deserialize_with = "null_as_default")]
    pub song_progress: BTreeMap<String, SongProgress>,

    #[serde(default, deserialize_with = "null_as_default")]
    pub custom_chords: Vec<CustomChord>,

    #[serde(default, deserialize_with = "null_as_default")]
    pub practice_sessions: Vec<PracticeSession>,

    /// Unix ms of the last successful sync pass
    #[serde(default, deserialize_with = "null_as_default")]
    pub last_sync_timestamp: i64,
}

/// Per-song practice progress
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SongProgress {
    pub song_id: String,
    pub last_practiced: DateTime<Utc>,
    /// Seconds
    pub total_practice_time: u64,
    /// 0-100
    pub mastery_level: u8,
    #[serde(default)]
    pub practice_sessions: Vec<PracticeSession>,
}

/// One practice session; immutable once recorded
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PracticeSession {
    pub id: String,
    pub song_id: String,
    pub date: DateTime<Utc>,
    /// Seconds
    pub duration: u64,
    pub completed: bool,
}

/// A user-defined chord shape
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomChord {
    pub id: String,
    pub name: String,
    /// Fret per string, low E first; -1 is muted, 0 is open
    pub frets: Vec<i8>,
    /// Finger per string, 0 for none
    pub fingers: Vec<u8>,
    #[serde(default)]
    pub is_barred: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub barred_fret: Option<u8>,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
}

impl SongProgress {
    /// Empty progress for a song that has never been practiced
    pub fn new(song_id: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            song_id: song_id.into(),
            last_practiced: now,
            total_practice_time: 0,
            mastery_level: 0,
            practice_sessions: Vec::new(),
        }
    }

    /// Append a session and refresh the derived fields in one step
    pub fn record(&mut self, session: PracticeSession) {
        self.last_practiced = session.date;
        self.total_practice_time += session.duration;
        self.practice_sessions.push(session);
        self.mastery_level = self.compute_mastery();
    }

    /// Completion rate weighted 70%, practice time (capped at one hour) 30%
    fn compute_mastery(&self) -> u8 {
        if self.practice_sessions.is_empty() {
            return 0;
        }
        let completed = self.practice_sessions.iter().filter(|s| s.completed).count();
        let completion_rate = completed as f64 / self.practice_sessions.len() as f64;
        let time_weight = (self.total_practice_time as f64 / 3600.0).min(1.0);
        ((completion_rate * 0.7 + time_weight * 0.3) * 100.0).round() as u8
    }
}

impl PracticeSession {
    /// Create a session with a fresh id
    pub fn new(song_id: impl Into<String>, date: DateTime<Utc>, duration: u64, completed: bool) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            song_id: song_id.into(),
            date,
            duration,
            completed,
        }
    }
}

/// Treat an explicit JSON `null` like a missing field
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
