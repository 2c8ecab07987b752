//! Backups and on-disk persistence

mod common;

use common::*;
use fretsync::backup::BackupManager;
use fretsync::facade::{ChordFacade, ProgressFacade};
use fretsync::models::SyncSnapshot;
use fretsync::store::{JsonFileStore, SnapshotStore};
use fretsync::sync::{ManualClock, SyncCoordinator};
use fretsync::SyncError;
use std::sync::Arc;
use tempfile::TempDir;

fn file_backed(dir: &TempDir) -> Arc<SnapshotStore> {
    let store = JsonFileStore::open(dir.path().join("store.json")).unwrap();
    Arc::new(SnapshotStore::new(Arc::new(store)))
}

#[tokio::test]
async fn backup_then_restore() {
    let dir = TempDir::new().unwrap();
    let local = file_backed(&dir);
    let clock = Arc::new(ManualClock::new(T0));
    let manager = BackupManager::new(local.clone(), dir.path().join("backups"), "1.2.0", clock.clone());
    let progress = ProgressFacade::new(local.clone(), clock.clone());

    progress.toggle_favorite("song1").await.unwrap();
    progress.record_practice_session("song1", 300, true).await.unwrap();
    let path = manager.create().unwrap();

    progress.toggle_favorite("song1").await.unwrap();
    progress.toggle_favorite("song2").await.unwrap();
    local
        .write()
        .await
        .commit(vec![("lastSyncTimestamp".to_string(), serde_json::json!(T0 + 5))])
        .unwrap();

    manager.restore(&path).await.unwrap();

    let restored = local.read().unwrap();
    assert_eq!(restored.favorites, vec!["song1"]);
    assert_eq!(restored.practice_sessions.len(), 1);
    assert_eq!(restored.song_progress["song1"].total_practice_time, 300);
    // The sync marker is not part of a backup
    assert_eq!(restored.last_sync_timestamp, T0 + 5);
}

#[tokio::test]
async fn list_is_newest_first_and_skips_garbage() {
    let dir = TempDir::new().unwrap();
    let backups = dir.path().join("backups");
    let clock = Arc::new(ManualClock::new(T0));
    let manager = BackupManager::new(file_backed(&dir), &backups, "1.0.0", clock.clone());

    assert!(manager.list().unwrap().is_empty());

    let older = manager.create().unwrap();
    clock.advance(60_000);
    let newer = manager.create().unwrap();
    std::fs::write(backups.join("broken.json"), "{not json").unwrap();

    let listed = manager.list().unwrap();
    assert_eq!(listed.len(), 2);
    assert_eq!(listed[0].path, newer);
    assert_eq!(listed[1].path, older);
    assert_eq!(listed[0].timestamp, T0 + 60_000);
    assert!(listed[0].size > 0);

    manager.delete(&older).unwrap();
    assert_eq!(manager.list().unwrap().len(), 1);
    assert!(matches!(manager.delete(&older), Err(SyncError::NotFound(_))));
}

#[tokio::test]
async fn incompatible_backup_is_refused() {
    let dir = TempDir::new().unwrap();
    let local = file_backed(&dir);
    let clock = Arc::new(ManualClock::new(T0));
    let old = BackupManager::new(local.clone(), dir.path().join("backups"), "1.0.0", clock.clone());
    let current = BackupManager::new(local.clone(), dir.path().join("backups"), "2.0.0", clock.clone());
    let chords = ChordFacade::new(local.clone(), clock);

    let path = old.create().unwrap();
    chords
        .create("Em", vec![0, 2, 2, 0, 0, 0], vec![0, 2, 3, 0, 0, 0], None, "user-1")
        .await
        .unwrap();

    let err = current.restore(&path).await.unwrap_err();
    assert!(matches!(err, SyncError::IncompatibleBackup { .. }));
    assert_eq!(chords.list().unwrap().len(), 1);
}

#[tokio::test]
async fn merged_snapshot_survives_reopen() {
    let dir = TempDir::new().unwrap();
    let remote = Arc::new(FakeRemote::with_snapshot(SyncSnapshot {
        custom_chords: vec![chord("c2", "Other")],
        ..favorites(&["song2"])
    }));

    {
        let local = file_backed(&dir);
        local.write().await.commit_snapshot(&favorites(&["song1"])).unwrap();
        let coordinator =
            SyncCoordinator::new(test_config(), local, remote.clone(), Arc::new(ManualClock::new(T0)));
        assert!(coordinator.sync_data().await);
    }

    let reopened = file_backed(&dir).read().unwrap();
    let mut favorites = reopened.favorites.clone();
    favorites.sort();
    assert_eq!(favorites, vec!["song1", "song2"]);
    assert_eq!(reopened.custom_chords, vec![chord("c2", "Other")]);
    assert_eq!(reopened.last_sync_timestamp, T0);
    assert_eq!(remote.stored().unwrap(), reopened);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_commits_from_worker_threads_all_land() {
    let dir = TempDir::new().unwrap();
    let local = file_backed(&dir);
    let progress = Arc::new(ProgressFacade::new(local.clone(), Arc::new(ManualClock::new(T0))));

    let tasks: Vec<_> = (0..16)
        .map(|i| {
            let progress = progress.clone();
            tokio::spawn(async move { progress.toggle_favorite(&format!("song{}", i)).await })
        })
        .collect();
    for task in tasks {
        assert!(task.await.unwrap().unwrap());
    }

    let reopened = file_backed(&dir).read().unwrap();
    assert_eq!(reopened.favorites.len(), 16);
    assert!(!dir.path().join("store.json.tmp").exists());
}
