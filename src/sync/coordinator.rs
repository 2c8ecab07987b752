//! Sync Coordinator
//!
//! Owns the sync lifecycle: the periodic timer, the single-flight guard and
//! the read → fetch → merge → persist → push sequence of one pass. Every
//! failure is contained here; callers only ever see a boolean.

use super::clock::Clock;
use super::merge::merge_snapshots;
use crate::config::SyncConfig;
use crate::error::{Result, SyncError};
use crate::models::SyncSnapshot;
use crate::remote::RemoteStore;
use crate::store::SnapshotStore;
use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::time::Instant;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

/// Coordinator events
#[derive(Debug, Clone, PartialEq)]
pub enum SyncEvent {
    /// Automatic sync timer started
    AutoSyncStarted,
    /// Automatic sync timer stopped
    AutoSyncStopped,
    /// A pass began
    Started,
    /// A pass finished
    Completed { outcome: PassOutcome, duration_ms: u64 },
    /// A pass failed; local data is unchanged by it
    Failed { error: String },
    /// A pass was requested while another was in flight
    Skipped,
}

/// What a successful pass did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassOutcome {
    /// No usable remote data; local pushed as-is
    PushedLocal,
    /// Merged, persisted locally and pushed
    Merged,
}

/// Coordinator phase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncPhase {
    /// No timer running and no pass in flight
    Stopped,
    /// Timer running, waiting for the next tick
    Idle,
    /// A pass is in flight
    Syncing,
}

/// Statistics about sync passes
#[derive(Debug, Clone, Default)]
pub struct SyncStats {
    /// Passes that ran
    pub total_syncs: u64,
    pub successful_syncs: u64,
    pub failed_syncs: u64,
    /// Requests turned away because a pass was in flight
    pub skipped_syncs: u64,
    /// Wall-clock time of the last successful pass
    pub last_sync: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
    /// Rolling average pass duration in ms
    pub avg_sync_duration_ms: f64,
}

type EventCallback = Arc<dyn Fn(SyncEvent) + Send + Sync>;

/// Handle to the sync coordinator; clones share the same state
#[derive(Clone)]
pub struct SyncCoordinator {
    inner: Arc<Inner>,
}

struct Inner {
    config: SyncConfig,
    local: Arc<SnapshotStore>,
    remote: Arc<dyn RemoteStore>,
    clock: Arc<dyn Clock>,
    in_flight: AtomicBool,
    timer: Mutex<Option<JoinHandle<()>>>,
    stats: RwLock<SyncStats>,
    event_callback: RwLock<Option<EventCallback>>,
}

/// Holds the single-flight flag; clears it on drop, including when the pass
/// future is cancelled
struct InFlight<'a>(&'a AtomicBool);

impl<'a> InFlight<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl SyncCoordinator {
    pub fn new(
        config: SyncConfig,
        local: Arc<SnapshotStore>,
        remote: Arc<dyn RemoteStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                config,
                local,
                remote,
                clock,
                in_flight: AtomicBool::new(false),
                timer: Mutex::new(None),
                stats: RwLock::new(SyncStats::default()),
                event_callback: RwLock::new(None),
            }),
        }
    }

    /// Set event callback
    pub fn on_event<F>(&self, callback: F)
    where
        F: Fn(SyncEvent) + Send + Sync + 'static,
    {
        *self.inner.event_callback.write() = Some(Arc::new(callback));
    }

    pub fn config(&self) -> &SyncConfig {
        &self.inner.config
    }

    /// The local data this coordinator syncs
    pub fn local(&self) -> &Arc<SnapshotStore> {
        &self.inner.local
    }

    pub fn stats(&self) -> SyncStats {
        self.inner.stats.read().clone()
    }

    pub fn is_syncing(&self) -> bool {
        self.inner.in_flight.load(Ordering::Acquire)
    }

    pub fn is_auto_sync_running(&self) -> bool {
        self.inner.timer.lock().is_some()
    }

    pub fn phase(&self) -> SyncPhase {
        if self.is_syncing() {
            SyncPhase::Syncing
        } else if self.is_auto_sync_running() {
            SyncPhase::Idle
        } else {
            SyncPhase::Stopped
        }
    }

    /// Start the periodic timer, replacing any running one. With
    /// `sync_on_start` the first pass runs immediately.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start_auto_sync(&self) -> Result<()> {
        if !self.inner.config.enabled {
            return Err(SyncError::Config("sync is disabled in configuration".to_string()));
        }
        if self.inner.config.interval_secs == 0 {
            return Err(SyncError::Config("sync interval must be at least one second".to_string()));
        }

        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| SyncError::Config(format!("auto sync needs a tokio runtime: {}", e)))?;

        let period = self.inner.config.interval();
        let sync_on_start = self.inner.config.sync_on_start;
        let weak: Weak<Inner> = Arc::downgrade(&self.inner);

        let handle = runtime.spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            // The first tick completes immediately
            if !sync_on_start {
                ticker.tick().await;
            }

            loop {
                ticker.tick().await;
                let Some(inner) = weak.upgrade() else { break };
                inner.sync_data().await;
            }
        });

        let previous = self.inner.timer.lock().replace(handle);
        if let Some(previous) = previous {
            previous.abort();
            debug!("Replaced running auto-sync timer");
        }

        info!("Auto sync started (every {:?})", period);
        self.inner.emit_event(SyncEvent::AutoSyncStarted);
        Ok(())
    }

    /// Cancel the periodic timer; no-op if not running
    pub fn stop_auto_sync(&self) {
        let handle = self.inner.timer.lock().take();
        if let Some(handle) = handle {
            handle.abort();
            info!("Auto sync stopped");
            self.inner.emit_event(SyncEvent::AutoSyncStopped);
        }
    }

    /// Run one sync pass. Returns `false` if another pass is in flight or the
    /// pass failed; a failed pass leaves local data as it was.
    pub async fn sync_data(&self) -> bool {
        self.inner.sync_data().await
    }

    /// Delete the remote copy of the user's data (account deletion).
    ///
    /// Stops automatic sync first. Returns `false` without deleting while a
    /// pass is in flight, since that pass would push its snapshot back.
    pub async fn delete_server_data(&self) -> bool {
        self.stop_auto_sync();

        let inner = &self.inner;
        let Some(_flight) = InFlight::acquire(&inner.in_flight) else {
            warn!("Sync in progress, not deleting remote data");
            return false;
        };

        match inner
            .with_retry("delete remote data", || inner.remote.delete_snapshot())
            .await
        {
            Ok(()) => {
                info!("Deleted remote data");
                true
            }
            Err(e) => {
                error!("Error deleting remote data: {}", e);
                false
            }
        }
    }
}

impl Inner {
    async fn sync_data(&self) -> bool {
        let Some(_flight) = InFlight::acquire(&self.in_flight) else {
            debug!("Sync already in progress, skipping");
            self.stats.write().skipped_syncs += 1;
            self.emit_event(SyncEvent::Skipped);
            return false;
        };

        let start = Instant::now();
        self.emit_event(SyncEvent::Started);

        let result = self.run_pass().await;
        let duration_ms = start.elapsed().as_millis() as u64;

        match result {
            Ok(outcome) => {
                self.record_success(duration_ms);
                info!("Sync completed ({:?}) in {} ms", outcome, duration_ms);
                self.emit_event(SyncEvent::Completed { outcome, duration_ms });
                true
            }
            Err(e) => {
                self.record_error(&e, duration_ms);
                error!("Sync failed: {}", e);
                self.emit_event(SyncEvent::Failed { error: e.to_string() });
                false
            }
        }
    }

    async fn run_pass(&self) -> Result<PassOutcome> {
        let local = self.local.read()?;

        let remote = match self
            .with_retry("fetch remote snapshot", || self.remote.fetch_snapshot())
            .await
        {
            Ok(Some(remote)) => remote,
            Ok(None) => {
                info!("No remote data yet, pushing local snapshot");
                return self.push_local(&local).await;
            }
            Err(e) => {
                warn!("Error fetching remote snapshot, treating local as authoritative: {}", e);
                return self.push_local(&local).await;
            }
        };

        let merged = {
            let writer = self.local.write().await;
            // Edits committed while the fetch was in flight are merged, not overwritten
            let current = writer.read()?;
            let now_ms = self.next_timestamp(current.last_sync_timestamp);
            let merged = merge_snapshots(&current, &remote, now_ms);
            writer.commit_snapshot(&merged)?;
            merged
        };
        debug!(
            "Persisted merged snapshot: {} favorites, {} songs, {} chords, {} sessions",
            merged.favorites.len(),
            merged.song_progress.len(),
            merged.custom_chords.len(),
            merged.practice_sessions.len()
        );

        self.with_retry("push merged snapshot", || self.remote.push_snapshot(&merged))
            .await?;
        Ok(PassOutcome::Merged)
    }

    async fn push_local(&self, local: &SyncSnapshot) -> Result<PassOutcome> {
        self.with_retry("push local snapshot", || self.remote.push_snapshot(local))
            .await?;
        Ok(PassOutcome::PushedLocal)
    }

    /// Current time, but never at or before the previous sync marker
    fn next_timestamp(&self, previous: i64) -> i64 {
        let now = self.clock.now_ms();
        if now > previous {
            now
        } else {
            warn!("Clock is behind last sync marker ({} <= {})", now, previous);
            previous + 1
        }
    }

    async fn with_retry<T, F, Fut>(&self, what: &str, mut op: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut attempt = 0;
        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_transient() && attempt < self.config.max_retries => {
                    let delay = self.config.retry_backoff(attempt);
                    warn!("{} failed (attempt {}): {}; retrying in {:?}", what, attempt + 1, e, delay);
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    fn record_success(&self, duration_ms: u64) {
        let mut stats = self.stats.write();
        stats.total_syncs += 1;
        stats.successful_syncs += 1;
        stats.last_sync = Some(self.clock.now());

        let n = stats.total_syncs as f64;
        stats.avg_sync_duration_ms = (stats.avg_sync_duration_ms * (n - 1.0) + duration_ms as f64) / n;
    }

    fn record_error(&self, error: &SyncError, duration_ms: u64) {
        let mut stats = self.stats.write();
        stats.total_syncs += 1;
        stats.failed_syncs += 1;
        stats.last_error = Some(error.to_string());

        let n = stats.total_syncs as f64;
        stats.avg_sync_duration_ms = (stats.avg_sync_duration_ms * (n - 1.0) + duration_ms as f64) / n;
    }

    fn emit_event(&self, event: SyncEvent) {
        let callback = self.event_callback.read().clone();
        if let Some(callback) = callback {
            callback(event);
        }
    }
}

impl Drop for Inner {
    fn drop(&mut self) {
        if let Some(handle) = self.timer.get_mut().take() {
            handle.abort();
        }
    }
}
