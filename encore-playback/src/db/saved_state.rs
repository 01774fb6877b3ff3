//! Saved playback state
//!
//! The persisted form refers to songs and parents by id only. Restoring it
//! against a library that has since changed drops songs that no longer exist
//! and compacts the heap and mappings around them.

use crate::error::Result;
use crate::playback::queue::RawQueue;
use crate::playback::state::PlaybackSnapshot;
use crate::playback::types::RepeatMode;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use encore_common::{Library, MusicParent, ParentId, SongId};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::RwLock;
use tracing::{debug, warn};

/// Serializable playback session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavedState {
    pub parent: Option<ParentId>,
    /// Song id of every heap slot, in heap order
    pub heap: Vec<SongId>,
    pub ordered_mapping: Vec<usize>,
    /// Empty when not shuffled
    pub shuffled_mapping: Vec<usize>,
    pub index: usize,
    /// Song that was current when saved
    pub song_id: Option<SongId>,
    pub position_ms: u64,
    pub repeat_mode: RepeatMode,
    pub saved_at: DateTime<Utc>,
}

/// Saved state resolved against a library
#[derive(Debug, Clone, PartialEq)]
pub struct RestoredState {
    pub parent: Option<MusicParent>,
    pub queue: RawQueue,
    pub position_ms: u64,
    pub repeat_mode: RepeatMode,
}

impl SavedState {
    /// Capture a snapshot; `None` when there is nothing to save
    pub fn from_snapshot(snapshot: &PlaybackSnapshot) -> Option<Self> {
        let queue = &snapshot.queue;
        if queue.is_empty() {
            return None;
        }
        Some(Self {
            parent: snapshot.parent.as_ref().map(MusicParent::id),
            heap: queue.heap.iter().map(|s| s.id).collect(),
            ordered_mapping: queue.ordered_mapping.clone(),
            shuffled_mapping: queue.shuffled_mapping.clone(),
            index: queue.index,
            song_id: queue.current_song().map(|s| s.id),
            position_ms: snapshot.progression.elapsed_position_ms(),
            repeat_mode: snapshot.repeat_mode,
            saved_at: encore_common::time::now(),
        })
    }

    /// Resolve against `library`, dropping songs it no longer has
    ///
    /// Returns `None` if nothing playable survives or the saved mappings are
    /// inconsistent.
    pub fn sanitize(&self, library: &Library) -> Option<RestoredState> {
        let mut heap = Vec::with_capacity(self.heap.len());
        let mut remap: HashMap<usize, usize> = HashMap::with_capacity(self.heap.len());
        for (old, id) in self.heap.iter().enumerate() {
            match library.find_song(*id) {
                Some(song) => {
                    remap.insert(old, heap.len());
                    heap.push(song);
                }
                None => debug!("Saved song {} no longer in library", id),
            }
        }

        let compact = |mapping: &[usize]| -> Vec<usize> {
            mapping.iter().filter_map(|i| remap.get(i).copied()).collect()
        };
        let ordered_mapping = compact(&self.ordered_mapping);
        let shuffled_mapping = compact(&self.shuffled_mapping);

        let active_before = if self.shuffled_mapping.is_empty() {
            &self.ordered_mapping
        } else {
            &self.shuffled_mapping
        };
        let active_after = if shuffled_mapping.is_empty() {
            &ordered_mapping
        } else {
            &shuffled_mapping
        };

        let current = active_before
            .get(self.index)
            .and_then(|old| remap.get(old))
            .and_then(|new| active_after.iter().position(|i| i == new));

        let (index, position_ms) = match current {
            Some(index) => (index, self.position_ms),
            None if self.index < active_after.len() => (self.index, 0),
            None => (0, 0),
        };

        let queue = RawQueue {
            heap,
            ordered_mapping,
            shuffled_mapping,
            index,
        };
        if queue.is_empty() {
            debug!("No saved songs survived");
            return None;
        }
        if let Err(e) = queue.validate() {
            warn!("Discarding saved state: {}", e);
            return None;
        }

        let parent = self.parent.and_then(|id| {
            let parent = library.find_parent(id);
            if parent.is_none() {
                debug!("Saved parent {} no longer in library", id);
            }
            parent
        });

        Some(RestoredState {
            parent,
            queue,
            position_ms,
            repeat_mode: self.repeat_mode,
        })
    }
}

/// Storage for the saved playback session
#[async_trait]
pub trait PersistenceRepository: Send + Sync {
    async fn load(&self) -> Result<Option<SavedState>>;

    /// Replace the stored state; `None` clears it
    async fn save(&self, state: Option<&SavedState>) -> Result<()>;
}

/// In-memory storage, used when no database is configured
#[derive(Debug, Default)]
pub struct MemoryPersistence {
    state: RwLock<Option<SavedState>>,
    saves: AtomicUsize,
}

impl MemoryPersistence {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_state(state: SavedState) -> Self {
        Self {
            state: RwLock::new(Some(state)),
            saves: AtomicUsize::new(0),
        }
    }

    /// Number of completed saves
    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PersistenceRepository for MemoryPersistence {
    async fn load(&self) -> Result<Option<SavedState>> {
        Ok(self.state.read().await.clone())
    }

    async fn save(&self, state: Option<&SavedState>) -> Result<()> {
        *self.state.write().await = state.cloned();
        self.saves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
