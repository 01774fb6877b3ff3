//! Reference state holder
//!
//! Owns the [`Queue`] and keeps one [`AudioEngine`] loaded with the current
//! song. Skips resume playback unless the user asked to remember pauses.

use super::AudioEngine;
use crate::db::SavedState;
use crate::error::{Error, Result};
use crate::playback::command::{CommandFactory, PlaybackCommand, ShuffleMode};
use crate::playback::holder::PlaybackStateHolder;
use crate::playback::progression::Progression;
use crate::playback::queue::{ChangeKind, Queue, QueueError, RawQueue};
use crate::playback::types::{DeferredOutcome, DeferredPlayback, RepeatMode, StateAck};
use async_trait::async_trait;
use encore_common::{MusicParent, MusicRepository, PlaybackSettings, Song};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Past this position, "previous" rewinds instead of stepping back
pub const REWIND_THRESHOLD_MS: u64 = 3000;

pub struct EngineStateHolder<E: AudioEngine> {
    engine: E,
    queue: Queue,
    parent: Option<MusicParent>,
    repeat_mode: RepeatMode,
    settings: PlaybackSettings,
    music: MusicRepository,
    factory: CommandFactory,
}

impl<E: AudioEngine> EngineStateHolder<E> {
    pub fn new(
        engine: E,
        music: MusicRepository,
        factory: CommandFactory,
        settings: PlaybackSettings,
    ) -> Self {
        Self {
            engine,
            queue: Queue::new(),
            parent: None,
            repeat_mode: RepeatMode::None,
            settings,
            music,
            factory,
        }
    }

    /// Replace the (empty) queue, e.g. with a seeded one
    pub fn with_queue(mut self, queue: Queue) -> Self {
        self.queue = queue;
        self
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    /// Whether a skip should leave the engine playing
    fn resume_after_skip(&self) -> bool {
        !self.settings.remember_pause || self.engine.is_playing()
    }

    /// Load the current song into the engine, or unload if there is none
    fn load_current(&mut self, play: bool) -> Result<()> {
        match self.queue.current_song() {
            Some(song) => {
                self.engine.load(&song)?;
                self.engine.set_playing(play);
            }
            None => self.engine.unload(),
        }
        Ok(())
    }

    /// Forget the parent once nothing is left to play
    fn forget_parent_if_empty(&mut self) {
        if self.queue.is_empty() {
            self.parent = None;
        }
    }

    fn clear(&mut self) {
        self.queue.clear();
        self.parent = None;
        self.engine.unload();
    }

    async fn restore(&mut self, saved: Option<&SavedState>, play: bool) -> Result<DeferredOutcome> {
        let Some(library) = self.music.library() else {
            return Ok(DeferredOutcome::Retry);
        };
        let Some(restored) = saved.and_then(|saved| saved.sanitize(&library)) else {
            info!("No saved playback state to restore");
            return Ok(DeferredOutcome::Handled(None));
        };

        let ack = self
            .apply_saved_state(
                restored.parent,
                restored.queue,
                restored.position_ms,
                restored.repeat_mode,
            )
            .await?;
        if play {
            self.engine.set_playing(true);
        }
        info!(songs = self.queue.len(), "Restored playback state");
        Ok(DeferredOutcome::Handled(ack))
    }
}

/// Whether `uri` has a scheme and a non-empty remainder
fn is_well_formed_uri(uri: &str) -> bool {
    match uri.split_once(':') {
        Some((scheme, rest)) => {
            !rest.is_empty()
                && scheme.chars().next().is_some_and(|c| c.is_ascii_alphabetic())
                && scheme
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
        }
        None => false,
    }
}

#[async_trait]
impl<E: AudioEngine> PlaybackStateHolder for EngineStateHolder<E> {
    fn progression(&self) -> Progression {
        Progression::new(
            self.engine.is_playing(),
            self.engine.is_advancing(),
            self.engine.position_ms(),
        )
    }

    fn repeat_mode(&self) -> RepeatMode {
        self.repeat_mode
    }

    fn parent(&self) -> Option<MusicParent> {
        self.parent.clone()
    }

    fn resolve_queue(&self) -> RawQueue {
        self.queue.to_raw()
    }

    async fn new_playback(&mut self, command: PlaybackCommand) -> Result<Option<StateAck>> {
        self.queue
            .start(command.song().cloned(), command.queue().to_vec(), command.shuffled())?;
        self.parent = command.parent().cloned();
        self.load_current(true)?;
        Ok(Some(StateAck::NewPlayback))
    }

    async fn playing(&mut self, playing: bool) -> Result<Option<StateAck>> {
        if self.queue.is_empty() || self.engine.is_playing() == playing {
            return Ok(None);
        }
        self.engine.set_playing(playing);
        Ok(Some(StateAck::ProgressionChanged))
    }

    async fn seek_to(&mut self, position_ms: u64) -> Result<Option<StateAck>> {
        if self.queue.is_empty() {
            return Err(Error::InvalidState("Cannot seek with an empty queue".to_string()));
        }
        self.engine.seek_to(position_ms);
        Ok(Some(StateAck::ProgressionChanged))
    }

    async fn set_repeat_mode(&mut self, repeat_mode: RepeatMode) -> Result<Option<StateAck>> {
        if self.repeat_mode == repeat_mode {
            return Ok(None);
        }
        self.repeat_mode = repeat_mode;
        Ok(Some(StateAck::RepeatModeChanged))
    }

    async fn next(&mut self) -> Result<Option<StateAck>> {
        if self.queue.is_empty() {
            return Ok(None);
        }

        let next = self.queue.index() + 1;
        if next < self.queue.len() {
            let play = self.resume_after_skip();
            self.queue.goto(next);
            self.load_current(play)?;
        } else {
            // Wrap around; only repeat-all keeps playing
            let play = self.repeat_mode == RepeatMode::All && self.resume_after_skip();
            self.queue.goto(0);
            self.load_current(play)?;
        }
        Ok(Some(StateAck::IndexMoved))
    }

    async fn prev(&mut self) -> Result<Option<StateAck>> {
        if self.queue.is_empty() {
            return Ok(None);
        }

        let play = self.resume_after_skip();
        let index = self.queue.index();
        if (self.settings.rewind_with_prev && self.engine.position_ms() >= REWIND_THRESHOLD_MS)
            || index == 0
        {
            self.engine.seek_to(0);
            self.engine.set_playing(play);
            return Ok(Some(StateAck::ProgressionChanged));
        }

        self.queue.goto(index - 1);
        self.load_current(play)?;
        Ok(Some(StateAck::IndexMoved))
    }

    async fn goto(&mut self, index: usize) -> Result<Option<StateAck>> {
        let play = self.resume_after_skip();
        if !self.queue.goto(index) {
            let len = self.queue.len();
            return Err(QueueError::InvalidIndex { index, len }.into());
        }
        self.load_current(play)?;
        Ok(Some(StateAck::IndexMoved))
    }

    async fn play_next(&mut self, songs: Vec<Arc<Song>>) -> Result<Option<StateAck>> {
        if songs.is_empty() {
            return Ok(None);
        }
        let size = songs.len();
        let at = self.queue.index() + 1;
        if self.queue.play_next(songs)? == ChangeKind::Song {
            self.parent = None;
            self.load_current(true)?;
            return Ok(Some(StateAck::NewPlayback));
        }
        Ok(Some(StateAck::PlayNext { at, size }))
    }

    async fn add_to_queue(&mut self, songs: Vec<Arc<Song>>) -> Result<Option<StateAck>> {
        if songs.is_empty() {
            return Ok(None);
        }
        let size = songs.len();
        let at = self.queue.len();
        if self.queue.add_to_queue(songs)? == ChangeKind::Song {
            self.parent = None;
            self.load_current(true)?;
            return Ok(Some(StateAck::NewPlayback));
        }
        Ok(Some(StateAck::AddToQueue { at, size }))
    }

    async fn move_song(&mut self, from: usize, to: usize) -> Result<Option<StateAck>> {
        self.queue.move_song(from, to)?;
        Ok(Some(StateAck::Move { from, to }))
    }

    async fn remove(&mut self, at: usize) -> Result<Option<StateAck>> {
        let play = self.resume_after_skip();
        if self.queue.remove(at)? == ChangeKind::Song {
            self.forget_parent_if_empty();
            self.load_current(play)?;
        }
        Ok(Some(StateAck::Remove { index: at }))
    }

    async fn shuffled(&mut self, shuffled: bool) -> Result<Option<StateAck>> {
        if self.queue.is_empty() {
            return Ok(None);
        }
        self.queue.reorder(shuffled);
        Ok(Some(StateAck::QueueReordered))
    }

    async fn handle_deferred(
        &mut self,
        action: &DeferredPlayback,
        saved: Option<&SavedState>,
    ) -> Result<DeferredOutcome> {
        if self.music.library().is_none() {
            debug!(action = %action, "Library not loaded, deferring");
            return Ok(DeferredOutcome::Retry);
        }

        match action {
            DeferredPlayback::RestoreSavedState { play } => self.restore(saved, *play).await,
            DeferredPlayback::ShuffleAll => match self.factory.all(ShuffleMode::On) {
                Some(command) => Ok(DeferredOutcome::Handled(self.new_playback(command).await?)),
                None => Ok(DeferredOutcome::Failed("Library has no songs to shuffle".to_string())),
            },
            DeferredPlayback::OpenUri { uri } => {
                if !is_well_formed_uri(uri) {
                    warn!("Refusing malformed URI '{}'", uri);
                    return Ok(DeferredOutcome::Failed(format!("Malformed URI '{}'", uri)));
                }
                let Some(library) = self.music.library() else {
                    debug!("Library not loaded yet, deferring open of '{}'", uri);
                    return Ok(DeferredOutcome::Retry);
                };
                let Some(song) = library.find_song_for_uri(uri) else {
                    return Ok(DeferredOutcome::Failed(format!("No song found for '{}'", uri)));
                };
                match self.factory.song(song, ShuffleMode::Implicit) {
                    Some(command) => {
                        Ok(DeferredOutcome::Handled(self.new_playback(command).await?))
                    }
                    None => Ok(DeferredOutcome::Failed(format!("Cannot play '{}'", uri))),
                }
            }
        }
    }

    async fn apply_saved_state(
        &mut self,
        parent: Option<MusicParent>,
        queue: RawQueue,
        position_ms: u64,
        repeat_mode: RepeatMode,
    ) -> Result<Option<StateAck>> {
        self.queue.apply_raw(queue)?;
        self.parent = parent;
        self.repeat_mode = repeat_mode;
        self.load_current(false)?;
        if !self.queue.is_empty() {
            self.engine.seek_to(position_ms);
        }
        Ok(Some(StateAck::NewPlayback))
    }

    async fn end_session(&mut self) -> Result<Option<StateAck>> {
        self.clear();
        Ok(Some(StateAck::SessionEnded))
    }

    async fn reset(&mut self) -> Result<Option<StateAck>> {
        self.clear();
        Ok(Some(StateAck::NewPlayback))
    }
}
