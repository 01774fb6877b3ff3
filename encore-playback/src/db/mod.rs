//! Saved-state persistence
//!
//! Storage back-ends for the playback session plus the debounced saver the
//! state manager drives.

pub mod saved_state;
pub mod saver;
pub mod sqlite;

pub use saved_state::{MemoryPersistence, PersistenceRepository, RestoredState, SavedState};
pub use saver::StateSaver;
pub use sqlite::SqlitePersistence;
