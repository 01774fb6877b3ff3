//! Playback progression
//!
//! A [`Progression`] is an immutable snapshot. The elapsed position is derived
//! from the position recorded at creation plus the monotonic time since, and
//! only advances while the engine is actually advancing.

use encore_common::time::duration_to_millis;
use tokio::time::Instant;

#[derive(Debug, Clone, Copy)]
pub struct Progression {
    is_playing: bool,
    is_advancing: bool,
    init_position_ms: u64,
    creation: Instant,
}

impl Progression {
    /// Snapshot taken now
    ///
    /// `is_advancing` is forced false when not playing.
    pub fn new(is_playing: bool, is_advancing: bool, position_ms: u64) -> Self {
        Self {
            is_playing,
            is_advancing: is_playing && is_advancing,
            init_position_ms: position_ms,
            creation: Instant::now(),
        }
    }

    /// Paused at position 0
    pub fn nil() -> Self {
        Self::new(false, false, 0)
    }

    /// Whether playback is requested
    pub fn is_playing(&self) -> bool {
        self.is_playing
    }

    /// Whether the position is moving (playing and not buffering)
    pub fn is_advancing(&self) -> bool {
        self.is_advancing
    }

    pub fn init_position_ms(&self) -> u64 {
        self.init_position_ms
    }

    /// Current position derived from the snapshot
    pub fn elapsed_position_ms(&self) -> u64 {
        self.position_at(Instant::now())
    }

    /// Position at a given instant
    pub fn position_at(&self, now: Instant) -> u64 {
        if !self.is_advancing {
            return self.init_position_ms;
        }
        let elapsed = now.saturating_duration_since(self.creation);
        self.init_position_ms.saturating_add(duration_to_millis(elapsed))
    }
}

impl Default for Progression {
    fn default() -> Self {
        Self::nil()
    }
}

/// Creation time is not part of a progression's identity
impl PartialEq for Progression {
    fn eq(&self, other: &Self) -> bool {
        self.is_playing == other.is_playing
            && self.is_advancing == other.is_advancing
            && self.init_position_ms == other.init_position_ms
    }
}

impl Eq for Progression {}
