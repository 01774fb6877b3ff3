//! Playback state holder seam
//!
//! A holder owns the queue and drives the audio engine. It is only ever
//! called by the [`PlaybackStateManager`](crate::playback::PlaybackStateManager),
//! one call at a time, and never calls back into the manager. Each mutating
//! call returns the [`StateAck`] describing what it committed, or `None` if
//! nothing changed.

use crate::db::SavedState;
use crate::error::Result;
use crate::playback::command::PlaybackCommand;
use crate::playback::progression::Progression;
use crate::playback::queue::RawQueue;
use crate::playback::types::{DeferredOutcome, DeferredPlayback, RepeatMode, StateAck};
use async_trait::async_trait;
use encore_common::{MusicParent, Song};
use std::sync::Arc;

#[async_trait]
pub trait PlaybackStateHolder: Send {
    fn progression(&self) -> Progression;

    fn repeat_mode(&self) -> RepeatMode;

    fn parent(&self) -> Option<MusicParent>;

    /// Copy of the current queue state
    fn resolve_queue(&self) -> RawQueue;

    /// Replace the session with the command's queue
    async fn new_playback(&mut self, command: PlaybackCommand) -> Result<Option<StateAck>>;

    async fn playing(&mut self, playing: bool) -> Result<Option<StateAck>>;

    async fn seek_to(&mut self, position_ms: u64) -> Result<Option<StateAck>>;

    async fn set_repeat_mode(&mut self, repeat_mode: RepeatMode) -> Result<Option<StateAck>>;

    async fn next(&mut self) -> Result<Option<StateAck>>;

    async fn prev(&mut self) -> Result<Option<StateAck>>;

    async fn goto(&mut self, index: usize) -> Result<Option<StateAck>>;

    /// Acks with [`StateAck::PlayNext`]
    async fn play_next(&mut self, songs: Vec<Arc<Song>>) -> Result<Option<StateAck>>;

    /// Acks with [`StateAck::AddToQueue`]
    async fn add_to_queue(&mut self, songs: Vec<Arc<Song>>) -> Result<Option<StateAck>>;

    async fn move_song(&mut self, from: usize, to: usize) -> Result<Option<StateAck>>;

    async fn remove(&mut self, at: usize) -> Result<Option<StateAck>>;

    async fn shuffled(&mut self, shuffled: bool) -> Result<Option<StateAck>>;

    /// Try to carry out a deferred action
    ///
    /// For a restore, `saved` is the stored session, already read by the
    /// manager; `None` means nothing was stored.
    async fn handle_deferred(
        &mut self,
        action: &DeferredPlayback,
        saved: Option<&SavedState>,
    ) -> Result<DeferredOutcome>;

    /// Adopt previously captured state, paused
    async fn apply_saved_state(
        &mut self,
        parent: Option<MusicParent>,
        queue: RawQueue,
        position_ms: u64,
        repeat_mode: RepeatMode,
    ) -> Result<Option<StateAck>>;

    /// Discard the queue and stop; acks with [`StateAck::SessionEnded`]
    async fn end_session(&mut self) -> Result<Option<StateAck>>;

    /// Discard the queue; acks with [`StateAck::NewPlayback`]
    async fn reset(&mut self) -> Result<Option<StateAck>>;
}
