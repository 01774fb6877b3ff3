//! Clock-driven engine with no audio output
//!
//! Position advances on the tokio clock while playing, so paused-time tests
//! can move it deterministically. Clones share state, which lets a test keep
//! a handle to inject buffering or load failures after the engine has been
//! handed to a holder.

use super::AudioEngine;
use crate::error::{Error, Result};
use encore_common::time::duration_to_millis;
use encore_common::{Song, SongId};
use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::time::Instant;
use tracing::debug;

#[derive(Debug)]
struct SimulatedState {
    loaded: Option<Arc<Song>>,
    playing: bool,
    buffering: bool,
    anchor_position_ms: u64,
    anchor: Instant,
    failing: HashSet<SongId>,
    loads: Vec<SongId>,
}

impl SimulatedState {
    fn advancing(&self) -> bool {
        self.loaded.is_some() && self.playing && !self.buffering
    }

    fn position_ms(&self) -> u64 {
        let Some(song) = &self.loaded else {
            return 0;
        };
        let position = if self.advancing() {
            self.anchor_position_ms
                .saturating_add(duration_to_millis(self.anchor.elapsed()))
        } else {
            self.anchor_position_ms
        };
        position.min(song.duration_ms)
    }

    /// Freeze the current position before a state change
    fn reanchor(&mut self) {
        self.anchor_position_ms = self.position_ms();
        self.anchor = Instant::now();
    }
}

#[derive(Debug, Clone)]
pub struct SimulatedEngine {
    state: Arc<Mutex<SimulatedState>>,
}

impl Default for SimulatedEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl SimulatedEngine {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(SimulatedState {
                loaded: None,
                playing: false,
                buffering: false,
                anchor_position_ms: 0,
                anchor: Instant::now(),
                failing: HashSet::new(),
                loads: Vec::new(),
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, SimulatedState> {
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Make every future load of `song` fail
    pub fn fail_on(&self, song: SongId) {
        self.lock().failing.insert(song);
    }

    pub fn set_buffering(&self, buffering: bool) {
        let mut state = self.lock();
        state.reanchor();
        state.buffering = buffering;
    }

    pub fn loaded_song(&self) -> Option<Arc<Song>> {
        self.lock().loaded.clone()
    }

    /// Ids of every song loaded so far, in order
    pub fn load_history(&self) -> Vec<SongId> {
        self.lock().loads.clone()
    }

    /// Whether the loaded song has played to its end
    pub fn at_end(&self) -> bool {
        let state = self.lock();
        match &state.loaded {
            Some(song) => state.position_ms() >= song.duration_ms,
            None => false,
        }
    }
}

impl AudioEngine for SimulatedEngine {
    fn load(&mut self, song: &Arc<Song>) -> Result<()> {
        let mut state = self.lock();
        if state.failing.contains(&song.id) {
            state.loaded = None;
            state.playing = false;
            return Err(Error::Engine(format!("Failed to load {}", song.uri)));
        }
        debug!(song = %song.id, "Loading song");
        state.loaded = Some(song.clone());
        state.loads.push(song.id);
        state.anchor_position_ms = 0;
        state.anchor = Instant::now();
        Ok(())
    }

    fn unload(&mut self) {
        let mut state = self.lock();
        state.loaded = None;
        state.playing = false;
        state.anchor_position_ms = 0;
        state.anchor = Instant::now();
    }

    fn set_playing(&mut self, playing: bool) {
        let mut state = self.lock();
        state.reanchor();
        state.playing = playing && state.loaded.is_some();
    }

    fn seek_to(&mut self, position_ms: u64) {
        let mut state = self.lock();
        let limit = state.loaded.as_ref().map_or(0, |s| s.duration_ms);
        state.anchor_position_ms = position_ms.min(limit);
        state.anchor = Instant::now();
    }

    fn position_ms(&self) -> u64 {
        self.lock().position_ms()
    }

    fn is_playing(&self) -> bool {
        self.lock().playing
    }

    fn is_advancing(&self) -> bool {
        self.lock().advancing()
    }
}
