//! Published playback state
//!
//! The manager publishes an immutable [`PlaybackSnapshot`] after every applied
//! ack. Readers on any thread get a consistent copy without touching the
//! manager's lock.

use crate::playback::progression::Progression;
use crate::playback::queue::RawQueue;
use crate::playback::types::RepeatMode;
use encore_common::{MusicParent, Song};
use std::fmt;
use std::sync::Arc;
use tokio::sync::watch;

/// Manager lifecycle phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlaybackPhase {
    /// No holder attached
    NoHolder,
    /// Holder attached, queue empty
    Idle,
    /// Holder attached, queue non-empty
    Active,
}

impl fmt::Display for PlaybackPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlaybackPhase::NoHolder => write!(f, "NoHolder"),
            PlaybackPhase::Idle => write!(f, "Idle"),
            PlaybackPhase::Active => write!(f, "Active"),
        }
    }
}

/// Last known playback state
#[derive(Debug, Clone, PartialEq)]
pub struct PlaybackSnapshot {
    pub phase: PlaybackPhase,
    pub queue: RawQueue,
    pub parent: Option<MusicParent>,
    pub progression: Progression,
    pub repeat_mode: RepeatMode,
}

impl PlaybackSnapshot {
    pub fn empty() -> Self {
        Self {
            phase: PlaybackPhase::NoHolder,
            queue: RawQueue::default(),
            parent: None,
            progression: Progression::nil(),
            repeat_mode: RepeatMode::None,
        }
    }

    pub fn current_song(&self) -> Option<Arc<Song>> {
        self.queue.current_song()
    }

    pub fn is_shuffled(&self) -> bool {
        self.queue.is_shuffled()
    }
}

impl Default for PlaybackSnapshot {
    fn default() -> Self {
        Self::empty()
    }
}

/// Read-only view of the manager's published state
#[derive(Debug, Clone)]
pub struct StateReader {
    rx: watch::Receiver<Arc<PlaybackSnapshot>>,
}

impl StateReader {
    pub(crate) fn new(rx: watch::Receiver<Arc<PlaybackSnapshot>>) -> Self {
        Self { rx }
    }

    /// Reader over a fixed snapshot with no manager behind it
    pub fn detached(snapshot: PlaybackSnapshot) -> Self {
        let (_tx, rx) = watch::channel(Arc::new(snapshot));
        Self { rx }
    }

    pub fn snapshot(&self) -> Arc<PlaybackSnapshot> {
        self.rx.borrow().clone()
    }

    pub fn phase(&self) -> PlaybackPhase {
        self.rx.borrow().phase
    }

    pub fn current_song(&self) -> Option<Arc<Song>> {
        self.rx.borrow().current_song()
    }

    pub fn resolve_queue(&self) -> Vec<Arc<Song>> {
        self.rx.borrow().queue.resolve()
    }

    pub fn progression(&self) -> Progression {
        self.rx.borrow().progression
    }

    pub fn repeat_mode(&self) -> RepeatMode {
        self.rx.borrow().repeat_mode
    }

    pub fn is_shuffled(&self) -> bool {
        self.rx.borrow().is_shuffled()
    }

    /// Wait for the next published snapshot
    ///
    /// Returns false once the manager has been dropped.
    pub async fn changed(&mut self) -> bool {
        self.rx.changed().await.is_ok()
    }
}
