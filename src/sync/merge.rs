//! Merge Engine
//!
//! Pure functions that reconcile a local and a remote snapshot. Append-only
//! entities (sessions, favorites, chords) merge by union so a concurrent edit
//! on another device never drops a record. Entities describing the current
//! state of one thing (preferences, per-song progress) keep one side.
//!
//! | field              | rule                                         |
//! |--------------------|----------------------------------------------|
//! | preferences        | shallow merge, local key wins                |
//! | favorites          | set union                                    |
//! | song progress      | later `lastPracticed` wins the whole record  |
//! | custom chords      | union by id, local wins                      |
//! | practice sessions  | union by id, newest first                    |
//! | last sync          | caller's clock                               |

use crate::models::{CustomChord, PracticeSession, Preferences, SongProgress, SyncSnapshot};
use std::collections::{BTreeMap, HashSet};

/// Merge `local` and `remote` into a new snapshot stamped with `now_ms`
pub fn merge_snapshots(local: &SyncSnapshot, remote: &SyncSnapshot, now_ms: i64) -> SyncSnapshot {
    SyncSnapshot {
        preferences: merge_preferences(&local.preferences, &remote.preferences),
        favorites: merge_favorites(&local.favorites, &remote.favorites),
        song_progress: merge_song_progress(&local.song_progress, &remote.song_progress),
        custom_chords: merge_custom_chords(&local.custom_chords, &remote.custom_chords),
        practice_sessions: merge_practice_sessions(&local.practice_sessions, &remote.practice_sessions),
        last_sync_timestamp: now_ms,
    }
}

pub fn merge_preferences(local: &Preferences, remote: &Preferences) -> Preferences {
    let mut merged = remote.clone();
    for (key, value) in local {
        merged.insert(key.clone(), value.clone());
    }
    merged
}

/// Local order first, then remote-only ids; duplicates dropped
pub fn merge_favorites(local: &[String], remote: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    local
        .iter()
        .chain(remote)
        .filter(|id| seen.insert(id.as_str()))
        .cloned()
        .collect()
}

/// Whole-record last-writer-wins. The losing record's session list is not
/// merged into the winner; on equal timestamps local is kept.
pub fn merge_song_progress(
    local: &BTreeMap<String, SongProgress>,
    remote: &BTreeMap<String, SongProgress>,
) -> BTreeMap<String, SongProgress> {
    let mut merged = remote.clone();
    for (song_id, progress) in local {
        let keep_local = match merged.get(song_id) {
            Some(theirs) => progress.last_practiced >= theirs.last_practiced,
            None => true,
        };
        if keep_local {
            merged.insert(song_id.clone(), progress.clone());
        }
    }
    merged
}

/// Remote order, with local definitions replacing same-id remote ones and
/// local-only chords appended
pub fn merge_custom_chords(local: &[CustomChord], remote: &[CustomChord]) -> Vec<CustomChord> {
    let mut merged: Vec<CustomChord> = Vec::with_capacity(local.len() + remote.len());
    let mut index: BTreeMap<&str, usize> = BTreeMap::new();

    for chord in remote.iter().chain(local) {
        match index.get(chord.id.as_str()) {
            Some(&pos) => merged[pos] = chord.clone(),
            None => {
                index.insert(chord.id.as_str(), merged.len());
                merged.push(chord.clone());
            }
        }
    }
    merged
}

/// Union by id, newest first; ties broken by id so the order is stable
pub fn merge_practice_sessions(local: &[PracticeSession], remote: &[PracticeSession]) -> Vec<PracticeSession> {
    let mut seen = HashSet::new();
    let mut merged: Vec<PracticeSession> = local
        .iter()
        .chain(remote)
        .filter(|session| seen.insert(session.id.as_str()))
        .cloned()
        .collect();

    merged.sort_by(|a, b| b.date.cmp(&a.date).then_with(|| a.id.cmp(&b.id)));
    merged
}
