//! Shared fixtures for the integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use fretsync::config::SyncConfig;
use fretsync::error::{Result, SyncError};
use fretsync::models::{CustomChord, PracticeSession, SongProgress, SyncSnapshot};
use fretsync::remote::RemoteStore;
use fretsync::store::{LocalStore, MemoryStore, SnapshotStore};
use fretsync::sync::{ManualClock, SyncCoordinator};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::{RwLock, RwLockWriteGuard};

pub const T0: i64 = 1_700_000_000_000;

/// In-memory remote with scripted failures and a gate to hold fetches open
#[derive(Default)]
pub struct FakeRemote {
    snapshot: Mutex<Option<SyncSnapshot>>,
    pub fetches: AtomicUsize,
    pub pushes: AtomicUsize,
    pub deletes: AtomicUsize,
    fetch_failures: AtomicUsize,
    push_failures: AtomicUsize,
    delete_failures: AtomicUsize,
    gate: RwLock<()>,
}

impl FakeRemote {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_snapshot(snapshot: SyncSnapshot) -> Self {
        let remote = Self::default();
        *remote.snapshot.lock() = Some(snapshot);
        remote
    }

    pub fn stored(&self) -> Option<SyncSnapshot> {
        self.snapshot.lock().clone()
    }

    pub fn fail_fetches(&self, n: usize) {
        self.fetch_failures.store(n, Ordering::SeqCst);
    }

    pub fn fail_pushes(&self, n: usize) {
        self.push_failures.store(n, Ordering::SeqCst);
    }

    pub fn fail_deletes(&self, n: usize) {
        self.delete_failures.store(n, Ordering::SeqCst);
    }

    /// Fetches wait until the returned guard is dropped
    pub async fn hold_fetches(&self) -> RwLockWriteGuard<'_, ()> {
        self.gate.write().await
    }

    pub fn push_count(&self) -> usize {
        self.pushes.load(Ordering::SeqCst)
    }

    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

fn take_failure(remaining: &AtomicUsize) -> bool {
    remaining
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
        .is_ok()
}

fn unavailable() -> SyncError {
    SyncError::RemoteStatus {
        status: 503,
        message: "unavailable".to_string(),
    }
}

#[async_trait]
impl RemoteStore for FakeRemote {
    async fn fetch_snapshot(&self) -> Result<Option<SyncSnapshot>> {
        let _open = self.gate.read().await;
        self.fetches.fetch_add(1, Ordering::SeqCst);
        if take_failure(&self.fetch_failures) {
            return Err(unavailable());
        }
        Ok(self.stored())
    }

    async fn push_snapshot(&self, snapshot: &SyncSnapshot) -> Result<()> {
        self.pushes.fetch_add(1, Ordering::SeqCst);
        if take_failure(&self.push_failures) {
            return Err(unavailable());
        }
        *self.snapshot.lock() = Some(snapshot.clone());
        Ok(())
    }

    async fn delete_snapshot(&self) -> Result<()> {
        self.deletes.fetch_add(1, Ordering::SeqCst);
        if take_failure(&self.delete_failures) {
            return Err(unavailable());
        }
        *self.snapshot.lock() = None;
        Ok(())
    }
}

/// Coordinator wired to in-memory stores and a manual clock
pub struct Harness {
    pub store: Arc<MemoryStore>,
    pub local: Arc<SnapshotStore>,
    pub remote: Arc<FakeRemote>,
    pub clock: Arc<ManualClock>,
    pub coordinator: SyncCoordinator,
}

impl Harness {
    pub fn new(remote: FakeRemote) -> Self {
        Self::with_config(remote, test_config())
    }

    pub fn with_config(remote: FakeRemote, config: SyncConfig) -> Self {
        let store = Arc::new(MemoryStore::new());
        let local = Arc::new(SnapshotStore::new(store.clone() as Arc<dyn LocalStore>));
        let remote = Arc::new(remote);
        let clock = Arc::new(ManualClock::new(T0));
        let coordinator = SyncCoordinator::new(config, local.clone(), remote.clone(), clock.clone());
        Self {
            store,
            local,
            remote,
            clock,
            coordinator,
        }
    }

    pub async fn seed(&self, snapshot: &SyncSnapshot) {
        self.local.write().await.commit_snapshot(snapshot).unwrap();
    }

    pub fn local_snapshot(&self) -> SyncSnapshot {
        self.local.read().unwrap()
    }
}

/// No retries and a one-second timer
pub fn test_config() -> SyncConfig {
    SyncConfig {
        interval_secs: 1,
        max_retries: 0,
        retry_backoff_ms: 1,
        ..SyncConfig::default()
    }
}

pub fn at(ms: i64) -> DateTime<Utc> {
    Utc.timestamp_millis_opt(ms).unwrap()
}

pub fn session(id: &str, song_id: &str, ms: i64) -> PracticeSession {
    PracticeSession {
        id: id.to_string(),
        song_id: song_id.to_string(),
        date: at(ms),
        duration: 60,
        completed: true,
    }
}

pub fn chord(id: &str, name: &str) -> CustomChord {
    CustomChord {
        id: id.to_string(),
        name: name.to_string(),
        frets: vec![-1, 3, 2, 0, 1, 0],
        fingers: vec![0, 3, 2, 0, 1, 0],
        is_barred: false,
        barred_fret: None,
        created_by: "user-1".to_string(),
        created_at: at(T0),
    }
}

pub fn progress(song_id: &str, last_ms: i64, total: u64) -> SongProgress {
    SongProgress {
        song_id: song_id.to_string(),
        last_practiced: at(last_ms),
        total_practice_time: total,
        mastery_level: 10,
        practice_sessions: Vec::new(),
    }
}

pub fn favorites(ids: &[&str]) -> SyncSnapshot {
    SyncSnapshot {
        favorites: ids.iter().map(|s| s.to_string()).collect(),
        ..SyncSnapshot::default()
    }
}

/// Yield until the coordinator reports a pass in flight
pub async fn wait_until_syncing(coordinator: &SyncCoordinator) {
    for _ in 0..1_000 {
        if coordinator.is_syncing() {
            return;
        }
        tokio::task::yield_now().await;
    }
    panic!("sync pass never started");
}
