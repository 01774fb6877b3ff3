//! Playback events
//!
//! Fine-grained change notifications published by the state manager. Events
//! are delivered in the order their acks were applied.

use crate::playback::queue::ChangeKind;
use crate::playback::types::{DeferredPlayback, RepeatMode};
use chrono::{DateTime, Utc};
use encore_common::{ParentId, SongId};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// How observers should patch their copy of the queue list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum QueueInstructions {
    /// `size` songs inserted at `at`
    Insert { at: usize, size: usize },
    Move { from: usize, to: usize },
    /// `size` songs removed starting at `at`
    Remove { at: usize, size: usize },
    /// Everything from `from` onward should be reloaded
    Replace { from: usize },
}

/// A queue mutation as seen by observers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueChange {
    pub kind: ChangeKind,
    pub instructions: QueueInstructions,
}

/// Playback event types
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum PlaybackEvent {
    /// The current index moved; the queue itself is unchanged
    IndexMoved {
        index: usize,
        song_id: Option<SongId>,
        timestamp: DateTime<Utc>,
    },

    /// Songs were inserted, moved or removed
    QueueChanged {
        change: QueueChange,
        index: usize,
        timestamp: DateTime<Utc>,
    },

    /// Shuffle was toggled or the queue was reshuffled
    QueueReordered {
        shuffled: bool,
        index: usize,
        timestamp: DateTime<Utc>,
    },

    /// A new session replaced the whole queue
    NewPlayback {
        parent: Option<ParentId>,
        song_id: Option<SongId>,
        queue_len: usize,
        shuffled: bool,
        timestamp: DateTime<Utc>,
    },

    ProgressionChanged {
        is_playing: bool,
        is_advancing: bool,
        position_ms: u64,
        timestamp: DateTime<Utc>,
    },

    RepeatModeChanged {
        repeat_mode: RepeatMode,
        timestamp: DateTime<Utc>,
    },

    /// The session ended and the queue was discarded
    SessionEnded { timestamp: DateTime<Utc> },

    /// The engine failed; playback was reset to idle
    EngineFailed {
        reason: String,
        timestamp: DateTime<Utc>,
    },

    /// A deferred action was dropped after failing permanently
    DeferredFailed {
        action: DeferredPlayback,
        reason: String,
        timestamp: DateTime<Utc>,
    },

    HolderAttached {
        handle: u64,
        timestamp: DateTime<Utc>,
    },

    HolderDetached {
        handle: u64,
        timestamp: DateTime<Utc>,
    },
}

impl PlaybackEvent {
    /// Event type name, matching the serialized `type` tag
    pub fn event_type(&self) -> &'static str {
        match self {
            PlaybackEvent::IndexMoved { .. } => "IndexMoved",
            PlaybackEvent::QueueChanged { .. } => "QueueChanged",
            PlaybackEvent::QueueReordered { .. } => "QueueReordered",
            PlaybackEvent::NewPlayback { .. } => "NewPlayback",
            PlaybackEvent::ProgressionChanged { .. } => "ProgressionChanged",
            PlaybackEvent::RepeatModeChanged { .. } => "RepeatModeChanged",
            PlaybackEvent::SessionEnded { .. } => "SessionEnded",
            PlaybackEvent::EngineFailed { .. } => "EngineFailed",
            PlaybackEvent::DeferredFailed { .. } => "DeferredFailed",
            PlaybackEvent::HolderAttached { .. } => "HolderAttached",
            PlaybackEvent::HolderDetached { .. } => "HolderDetached",
        }
    }
}

/// Broadcast bus for playback events
///
/// Built on tokio::broadcast: publishing never blocks, and slow subscribers
/// observe `Lagged` instead of stalling the manager.
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<PlaybackEvent>,
    capacity: usize,
}

impl EventBus {
    /// Creates a new EventBus with specified channel capacity
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self {
            tx,
            capacity,
        }
    }

    /// Subscribe to all future events
    pub fn subscribe(&self) -> broadcast::Receiver<PlaybackEvent> {
        self.tx.subscribe()
    }

    /// Emit an event to all subscribers
    ///
    /// Returns `Err` if no subscribers are listening.
    #[allow(clippy::result_large_err)]
    pub fn emit(
        &self,
        event: PlaybackEvent,
    ) -> Result<usize, broadcast::error::SendError<PlaybackEvent>> {
        self.tx.send(event)
    }

    /// Emit an event, ignoring if no subscribers are listening
    pub fn emit_lossy(&self, event: PlaybackEvent) {
        let _ = self.tx.send(event);
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
