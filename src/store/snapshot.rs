//! Snapshot view over a [`LocalStore`]
//!
//! Reads decode each entity key into its typed form, defaulting missing keys
//! to their empty value. Writes go through [`SnapshotStore::write`], which
//! hands out the single write gate shared by the sync coordinator and the
//! facades.

use super::{keys, LocalStore};
use crate::error::{Result, SyncError};
use crate::models::SyncSnapshot;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::{Mutex, MutexGuard};

pub struct SnapshotStore {
    store: Arc<dyn LocalStore>,
    gate: Mutex<()>,
}

/// Exclusive write access to the local store
pub struct SnapshotWriter<'a> {
    store: &'a dyn LocalStore,
    _guard: MutexGuard<'a, ()>,
}

impl SnapshotStore {
    pub fn new(store: Arc<dyn LocalStore>) -> Self {
        Self {
            store,
            gate: Mutex::new(()),
        }
    }

    /// Read the full local snapshot
    pub fn read(&self) -> Result<SyncSnapshot> {
        read_snapshot(self.store.as_ref())
    }

    /// Read one entity key
    pub fn get<T: DeserializeOwned + Default>(&self, key: &str) -> Result<T> {
        decode_key(self.store.as_ref(), key)
    }

    /// Wait for the write gate
    pub async fn write(&self) -> SnapshotWriter<'_> {
        SnapshotWriter {
            store: self.store.as_ref(),
            _guard: self.gate.lock().await,
        }
    }
}

impl SnapshotWriter<'_> {
    pub fn read(&self) -> Result<SyncSnapshot> {
        read_snapshot(self.store)
    }

    pub fn get<T: DeserializeOwned + Default>(&self, key: &str) -> Result<T> {
        decode_key(self.store, key)
    }

    /// Commit prepared entries all-or-nothing
    pub fn commit(&self, entries: Vec<(String, Value)>) -> Result<()> {
        self.store.set_many(entries)
    }

    /// Commit every entity of a snapshot all-or-nothing
    pub fn commit_snapshot(&self, snapshot: &SyncSnapshot) -> Result<()> {
        self.commit(vec![
            entry(keys::PREFERENCES, &snapshot.preferences)?,
            entry(keys::FAVORITES, &snapshot.favorites)?,
            entry(keys::SONG_PROGRESS, &snapshot.song_progress)?,
            entry(keys::CUSTOM_CHORDS, &snapshot.custom_chords)?,
            entry(keys::PRACTICE_SESSIONS, &snapshot.practice_sessions)?,
            entry(keys::LAST_SYNC_TIMESTAMP, &snapshot.last_sync_timestamp)?,
        ])
    }
}

/// Serialize a value into a store entry
pub fn entry<T: Serialize + ?Sized>(key: &str, value: &T) -> Result<(String, Value)> {
    Ok((key.to_string(), serde_json::to_value(value)?))
}

fn read_snapshot(store: &dyn LocalStore) -> Result<SyncSnapshot> {
    Ok(SyncSnapshot {
        preferences: decode_key(store, keys::PREFERENCES)?,
        favorites: decode_key(store, keys::FAVORITES)?,
        song_progress: decode_key(store, keys::SONG_PROGRESS)?,
        custom_chords: decode_key(store, keys::CUSTOM_CHORDS)?,
        practice_sessions: decode_key(store, keys::PRACTICE_SESSIONS)?,
        last_sync_timestamp: decode_key(store, keys::LAST_SYNC_TIMESTAMP)?,
    })
}

fn decode_key<T: DeserializeOwned + Default>(store: &dyn LocalStore, key: &str) -> Result<T> {
    let value = match store.get(key)? {
        None | Some(Value::Null) => return Ok(T::default()),
        Some(value) => value,
    };

    match serde_json::from_value::<T>(value.clone()) {
        Ok(decoded) => Ok(decoded),
        // Values written as JSON text, e.g. "1700000000000"
        Err(err) => match value {
            Value::String(text) => serde_json::from_str(&text)
                .map_err(|_| SyncError::Storage(format!("malformed value for '{}': {}", key, err))),
            _ => Err(SyncError::Storage(format!("malformed value for '{}': {}", key, err))),
        },
    }
}
