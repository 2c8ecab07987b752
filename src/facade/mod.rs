//! Facades over local practice data
//!
//! The app edits preferences, favorites, progress and chords through these.
//! Each edit is a read-modify-write under the store's write gate, so it can
//! never interleave with a sync pass persisting a merged snapshot.

pub mod chords;
pub mod preferences;
pub mod progress;

pub use chords::ChordFacade;
pub use preferences::{default_preferences, PracticeSchedule, PreferencesFacade};
pub use progress::ProgressFacade;
