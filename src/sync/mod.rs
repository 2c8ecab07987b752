//! Sync Module
//!
//! Reconciles the device's practice data with the remote copy.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │              SyncCoordinator                 │
//! │  ┌────────┐  ┌──────────────────────────┐    │
//! │  │ Timer  │─▶│ read ─▶ fetch ─▶ merge   │    │
//! │  │(tokio) │  │   ─▶ persist ─▶ push     │    │
//! │  └────────┘  └──────────────────────────┘    │
//! │      │              │            │           │
//! │      ▼              ▼            ▼           │
//! │  SnapshotStore   merge.rs   RemoteStore      │
//! └─────────────────────────────────────────────┘
//! ```

pub mod clock;
pub mod coordinator;
pub mod merge;

pub use clock::{Clock, ManualClock, SystemClock};
pub use coordinator::{PassOutcome, SyncCoordinator, SyncEvent, SyncPhase, SyncStats};
pub use merge::merge_snapshots;
