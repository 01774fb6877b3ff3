//! Audio engine seam and the reference state holder built on it
//!
//! The engine only knows about the one song it has loaded. Queue bookkeeping
//! stays in [`EngineStateHolder`], which drives any [`AudioEngine`].

mod holder;
mod simulated;

pub use holder::EngineStateHolder;
pub use simulated::SimulatedEngine;

use crate::error::Result;
use encore_common::Song;
use std::sync::Arc;

/// Minimal control surface of an audio engine
pub trait AudioEngine: Send {
    /// Load `song` paused at position 0
    ///
    /// Load failures are reported as [`Error::Engine`](crate::Error::Engine).
    fn load(&mut self, song: &Arc<Song>) -> Result<()>;

    /// Stop and release the loaded song
    fn unload(&mut self);

    fn set_playing(&mut self, playing: bool);

    fn seek_to(&mut self, position_ms: u64);

    fn position_ms(&self) -> u64;

    fn is_playing(&self) -> bool;

    /// Playing and not buffering
    fn is_advancing(&self) -> bool;
}

/// Notifications originating from the engine rather than a caller
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    /// The loaded song played to its end
    TrackEnded,
    PlayingChanged(bool),
    BufferingChanged(bool),
    /// Position jumped without a seek request
    PositionDiscontinuity,
    /// Decoder or output failure
    Failed { reason: String },
}
