//! Shared fixtures for encore-playback integration tests
//!
//! - `library_with`: small libraries with predictable titles
//! - `Harness`: a manager with a simulated-engine holder attached
//! - `RecordingHolder`: a holder that only records what it was asked to do

#![allow(dead_code)]

use async_trait::async_trait;
use encore_common::library::ParentRecord;
use encore_common::{
    AlbumId, ArtistId, GenreId, Library, LibraryRecords, MusicParent, MusicRepository,
    PlaybackSettings, Song, SongId,
};
use encore_playback::db::{MemoryPersistence, PersistenceRepository, SavedState};
use encore_playback::playback::{
    CommandFactory, DeferredOutcome, DeferredPlayback, EngineStateHolder, HolderHandle,
    PlaybackCommand, PlaybackEvent, PlaybackStateHolder, PlaybackStateManager, Progression, Queue,
    RawQueue, RepeatMode, ShuffleMode, SimulatedEngine, StateAck,
};
use encore_playback::Result;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::broadcast;

pub const SONG_DURATION_MS: u64 = 180_000;

pub fn make_song(title: &str, album: AlbumId, track: u32) -> Song {
    Song {
        id: SongId::new_v4(),
        title: title.to_string(),
        uri: format!("file:///music/{}.flac", title),
        duration_ms: SONG_DURATION_MS,
        album,
        artists: Vec::new(),
        genres: Vec::new(),
        disc: None,
        track: Some(track),
        year: Some(2000 + track as i32),
    }
}

/// One album by one artist in one genre, titled in track order
pub fn library_with(titles: &[&str]) -> Library {
    let album = AlbumId::new_v4();
    let artist = ArtistId::new_v4();
    let genre = GenreId::new_v4();

    let songs: Vec<Song> = titles
        .iter()
        .enumerate()
        .map(|(i, title)| {
            let mut song = make_song(title, album, i as u32 + 1);
            song.artists = vec![artist];
            song.genres = vec![genre];
            song
        })
        .collect();
    let ids: Vec<SongId> = songs.iter().map(|s| s.id).collect();

    let records = LibraryRecords {
        songs,
        albums: vec![ParentRecord {
            id: album,
            name: "Album".to_string(),
            songs: ids.clone(),
        }],
        artists: vec![ParentRecord {
            id: artist,
            name: "Artist".to_string(),
            songs: ids.clone(),
        }],
        genres: vec![ParentRecord {
            id: genre,
            name: "Genre".to_string(),
            songs: ids,
        }],
        playlists: Vec::new(),
    };
    Library::new(records).expect("fixture library is consistent")
}

pub fn abcde() -> Library {
    library_with(&["A", "B", "C", "D", "E"])
}

/// Settings with a short save debounce
pub fn test_settings() -> PlaybackSettings {
    PlaybackSettings {
        save_debounce_ms: 50,
        ..PlaybackSettings::default()
    }
}

pub fn titles(songs: &[Arc<Song>]) -> Vec<String> {
    songs.iter().map(|s| s.title.clone()).collect()
}

/// Everything received so far, without waiting
pub fn drain_events(rx: &mut broadcast::Receiver<PlaybackEvent>) -> Vec<PlaybackEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

pub struct Harness {
    pub manager: Arc<PlaybackStateManager>,
    pub music: MusicRepository,
    pub factory: CommandFactory,
    pub engine: SimulatedEngine,
    pub persistence: Arc<MemoryPersistence>,
    pub handle: HolderHandle,
    pub settings: PlaybackSettings,
}

impl Harness {
    pub async fn new(library: Library) -> Self {
        Self::with_settings(Some(library), test_settings(), Arc::new(MemoryPersistence::new()))
            .await
    }

    pub async fn with_settings(
        library: Option<Library>,
        settings: PlaybackSettings,
        persistence: Arc<MemoryPersistence>,
    ) -> Self {
        let music = match library {
            Some(library) => MusicRepository::with_library(library),
            None => MusicRepository::new(),
        };
        let repository: Arc<dyn PersistenceRepository> = persistence.clone();
        let manager = Arc::new(PlaybackStateManager::with_persistence(&settings, repository));
        let factory = CommandFactory::new(
            music.clone(),
            Default::default(),
            settings.keep_shuffle,
            manager.reader(),
        );
        let engine = SimulatedEngine::new();
        let handle = manager
            .register_holder(Box::new(new_holder(&engine, &music, &factory, &settings)))
            .await
            .expect("first holder attaches");

        Self {
            manager,
            music,
            factory,
            engine,
            persistence,
            handle,
            settings,
        }
    }

    /// A fresh holder sharing this harness's engine and library
    pub fn holder(&self) -> EngineStateHolder<SimulatedEngine> {
        new_holder(&self.engine, &self.music, &self.factory, &self.settings)
    }

    pub fn song(&self, title: &str) -> Arc<Song> {
        self.music
            .library()
            .and_then(|library| library.songs().iter().find(|s| s.title == title).cloned())
            .unwrap_or_else(|| panic!("no song titled {}", title))
    }

    pub fn songs(&self, titles: &[&str]) -> Vec<Arc<Song>> {
        titles.iter().map(|t| self.song(t)).collect()
    }

    /// Titles of the published queue in active order
    pub fn queue_titles(&self) -> Vec<String> {
        titles(&self.manager.resolve_queue())
    }

    /// Start playing the whole album from `title`, unshuffled
    pub async fn play_album_from(&self, title: &str) {
        let command = self
            .factory
            .song_from_album(self.song(title), ShuffleMode::Off)
            .expect("album command");
        self.manager.new_playback(command).await.expect("new playback");
    }
}

fn new_holder(
    engine: &SimulatedEngine,
    music: &MusicRepository,
    factory: &CommandFactory,
    settings: &PlaybackSettings,
) -> EngineStateHolder<SimulatedEngine> {
    EngineStateHolder::new(engine.clone(), music.clone(), factory.clone(), settings.clone())
        .with_queue(Queue::with_seed(42))
}

/// Holder with no queue that records deferred actions
///
/// Deferred actions are answered with `Retry` until `ready` is set.
#[derive(Clone, Default)]
pub struct RecordingHolder {
    pub ready: Arc<AtomicBool>,
    pub handled: Arc<Mutex<Vec<DeferredPlayback>>>,
    pub adopted: Arc<Mutex<Vec<RawQueue>>>,
}

impl RecordingHolder {
    pub fn handled(&self) -> Vec<DeferredPlayback> {
        self.handled.lock().unwrap().clone()
    }

    pub fn adopted(&self) -> Vec<RawQueue> {
        self.adopted.lock().unwrap().clone()
    }
}

#[async_trait]
impl PlaybackStateHolder for RecordingHolder {
    fn progression(&self) -> Progression {
        Progression::nil()
    }

    fn repeat_mode(&self) -> RepeatMode {
        RepeatMode::None
    }

    fn parent(&self) -> Option<MusicParent> {
        None
    }

    fn resolve_queue(&self) -> RawQueue {
        RawQueue::default()
    }

    async fn new_playback(&mut self, _command: PlaybackCommand) -> Result<Option<StateAck>> {
        Ok(None)
    }

    async fn playing(&mut self, _playing: bool) -> Result<Option<StateAck>> {
        Ok(None)
    }

    async fn seek_to(&mut self, _position_ms: u64) -> Result<Option<StateAck>> {
        Ok(None)
    }

    async fn set_repeat_mode(&mut self, _repeat_mode: RepeatMode) -> Result<Option<StateAck>> {
        Ok(None)
    }

    async fn next(&mut self) -> Result<Option<StateAck>> {
        Ok(None)
    }

    async fn prev(&mut self) -> Result<Option<StateAck>> {
        Ok(None)
    }

    async fn goto(&mut self, _index: usize) -> Result<Option<StateAck>> {
        Ok(None)
    }

    async fn play_next(&mut self, _songs: Vec<Arc<Song>>) -> Result<Option<StateAck>> {
        Ok(None)
    }

    async fn add_to_queue(&mut self, _songs: Vec<Arc<Song>>) -> Result<Option<StateAck>> {
        Ok(None)
    }

    async fn move_song(&mut self, _from: usize, _to: usize) -> Result<Option<StateAck>> {
        Ok(None)
    }

    async fn remove(&mut self, _at: usize) -> Result<Option<StateAck>> {
        Ok(None)
    }

    async fn shuffled(&mut self, _shuffled: bool) -> Result<Option<StateAck>> {
        Ok(None)
    }

    async fn handle_deferred(
        &mut self,
        action: &DeferredPlayback,
        _saved: Option<&SavedState>,
    ) -> Result<DeferredOutcome> {
        if !self.ready.load(Ordering::SeqCst) {
            return Ok(DeferredOutcome::Retry);
        }
        self.handled.lock().unwrap().push(action.clone());
        Ok(DeferredOutcome::Handled(None))
    }

    async fn apply_saved_state(
        &mut self,
        _parent: Option<MusicParent>,
        queue: RawQueue,
        _position_ms: u64,
        _repeat_mode: RepeatMode,
    ) -> Result<Option<StateAck>> {
        self.adopted.lock().unwrap().push(queue);
        Ok(None)
    }

    async fn end_session(&mut self) -> Result<Option<StateAck>> {
        Ok(Some(StateAck::SessionEnded))
    }

    async fn reset(&mut self) -> Result<Option<StateAck>> {
        Ok(Some(StateAck::NewPlayback))
    }
}
