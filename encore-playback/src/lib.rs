//! # Encore Playback Library (encore-playback)
//!
//! Playback queue and playback-state orchestration.
//!
//! **Purpose:** Keep a heap-backed, shuffle-stable play queue consistent with an
//! external audio engine, and publish a single source of truth for playback
//! state to the rest of the application.
//!
//! **Architecture:** Callers issue intents to a [`PlaybackStateManager`], which
//! forwards them one at a time to the attached [`PlaybackStateHolder`]. The
//! holder mutates its queue and engine and acknowledges what changed; the
//! manager mirrors the result, persists it, and broadcasts events.

pub mod db;
pub mod error;
pub mod playback;
pub mod replay;

pub use error::{Error, Result};
pub use playback::{
    CommandFactory, DeferredPlayback, HolderHandle, PlaybackCommand, PlaybackEvent,
    PlaybackStateHolder, PlaybackStateManager, Progression, Queue, RawQueue, RepeatMode,
    ShuffleMode, StateAck,
};
