//! Local Store
//!
//! Key/value persistence of JSON records on the device. Stores know nothing
//! about sync; [`SnapshotStore`] layers the snapshot view and the shared
//! write gate on top of any [`LocalStore`].
//!
//! ```text
//! ┌──────────────────────────────┐
//! │        SnapshotStore          │
//! │  read() ── write().commit()   │
//! │        │  (write gate)        │
//! │  ┌─────▼──────────────────┐   │
//! │  │ dyn LocalStore         │   │
//! │  │ MemoryStore │ JsonFile │   │
//! │  └────────────────────────┘   │
//! └──────────────────────────────┘
//! ```

pub mod file;
pub mod memory;
pub mod snapshot;

pub use file::JsonFileStore;
pub use memory::MemoryStore;
pub use snapshot::{SnapshotStore, SnapshotWriter};

use crate::error::Result;
use serde_json::Value;

/// Storage keys for the synchronized entities
pub mod keys {
    pub const PREFERENCES: &str = "preferences";
    pub const FAVORITES: &str = "favorites";
    pub const SONG_PROGRESS: &str = "songProgress";
    pub const CUSTOM_CHORDS: &str = "customChords";
    pub const PRACTICE_SESSIONS: &str = "practiceSessions";
    pub const LAST_SYNC_TIMESTAMP: &str = "lastSyncTimestamp";

    pub const ALL: [&str; 6] = [
        PREFERENCES,
        FAVORITES,
        SONG_PROGRESS,
        CUSTOM_CHORDS,
        PRACTICE_SESSIONS,
        LAST_SYNC_TIMESTAMP,
    ];
}

/// Persistent key/value storage of JSON values
///
/// Methods may block on I/O. They are called from async code while the
/// snapshot write gate is held, so implementations should keep each call
/// short and must finish it even if the calling task is later cancelled.
pub trait LocalStore: Send + Sync {
    /// Read a value; `None` if the key was never written
    fn get(&self, key: &str) -> Result<Option<Value>>;

    /// Write a single value
    fn set(&self, key: &str, value: Value) -> Result<()>;

    /// Write several values all-or-nothing
    fn set_many(&self, entries: Vec<(String, Value)>) -> Result<()>;
}
