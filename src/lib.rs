//! fretsync - offline-first sync for guitar practice data
//!
//! User data (preferences, favorites, song progress, custom chords and
//! practice history) lives on the device and is reconciled with a remote
//! copy by a field-aware merge.
//!
//! - [`store`] - local key/value persistence and the snapshot write gate
//! - [`remote`] - client for the remote snapshot endpoint
//! - [`sync`] - merge engine and sync coordinator
//! - [`facade`] - the app-facing entry points that mutate local data
//! - [`backup`] - local backup files
//! - `server` - reference backend (feature `server`)

pub mod backup;
pub mod config;
pub mod error;
pub mod facade;
pub mod models;
pub mod remote;
pub mod store;
pub mod sync;

#[cfg(feature = "server")]
pub mod server;

pub use backup::{BackupInfo, BackupManager};
pub use config::Config;
pub use error::{Result, SyncError};
pub use models::{CustomChord, PracticeSession, Preferences, SongProgress, SyncSnapshot};
pub use sync::{SyncCoordinator, SyncEvent, SyncStats};
