//! Playback types shared across modules

use serde::{Deserialize, Serialize};
use std::fmt;

/// Repeat behaviour at the end of a song or the queue
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RepeatMode {
    /// Stop at the end of the queue
    #[default]
    None,
    /// Loop the whole queue
    All,
    /// Loop the current song
    Track,
}

impl fmt::Display for RepeatMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RepeatMode::None => write!(f, "none"),
            RepeatMode::All => write!(f, "all"),
            RepeatMode::Track => write!(f, "track"),
        }
    }
}

impl std::str::FromStr for RepeatMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "none" => Ok(RepeatMode::None),
            "all" => Ok(RepeatMode::All),
            "track" => Ok(RepeatMode::Track),
            other => Err(format!("Unknown repeat mode: {}", other)),
        }
    }
}

/// Shape of a mutation a holder has committed
///
/// Produced by a holder, consumed once by the manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateAck {
    /// The current index moved without touching the mapping
    IndexMoved,
    /// `size` songs were inserted after the current song, starting at `at`
    PlayNext { at: usize, size: usize },
    /// `size` songs were appended, starting at `at`
    AddToQueue { at: usize, size: usize },
    Move { from: usize, to: usize },
    Remove { index: usize },
    /// Shuffle state or order changed
    QueueReordered,
    NewPlayback,
    ProgressionChanged,
    RepeatModeChanged,
    SessionEnded,
}

/// Playback intent that waits for a holder and a loaded library
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum DeferredPlayback {
    /// Restore the persisted session, optionally starting playback
    RestoreSavedState { play: bool },
    /// Play the whole library shuffled
    ShuffleAll,
    /// Play a song referenced by an external URI
    OpenUri { uri: String },
}

impl DeferredPlayback {
    /// Whether two actions are the same kind, ignoring their payload
    pub fn same_kind(&self, other: &DeferredPlayback) -> bool {
        std::mem::discriminant(self) == std::mem::discriminant(other)
    }
}

impl fmt::Display for DeferredPlayback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeferredPlayback::RestoreSavedState { play } => write!(f, "restore(play={})", play),
            DeferredPlayback::ShuffleAll => write!(f, "shuffle-all"),
            DeferredPlayback::OpenUri { uri } => write!(f, "open({})", uri),
        }
    }
}

/// Result of a holder attempting a deferred action
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeferredOutcome {
    /// Not possible yet; keep the action queued
    Retry,
    /// Done, with the ack for whatever changed
    Handled(Option<StateAck>),
    /// Permanently failed; drop the action
    Failed(String),
}
