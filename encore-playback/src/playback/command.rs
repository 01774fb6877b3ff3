//! Playback commands
//!
//! A [`PlaybackCommand`] is a validated "what to play, from where, in what
//! order" request. Commands can only be built through [`CommandFactory`],
//! which guarantees that a target song is a member of the resolved queue and
//! that the queue is not empty. Requests that cannot be satisfied resolve to
//! `None` and never reach a holder.

use crate::playback::state::StateReader;
use encore_common::{
    Album, Artist, Genre, ListSettings, MusicParent, MusicRepository, Playlist, Song, Sort,
};
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// How a new session should treat shuffle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShuffleMode {
    On,
    Off,
    /// Keep the current session's shuffle state, if the user prefers so
    Implicit,
}

impl std::str::FromStr for ShuffleMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "on" => Ok(ShuffleMode::On),
            "off" => Ok(ShuffleMode::Off),
            "implicit" => Ok(ShuffleMode::Implicit),
            other => Err(format!("Unknown shuffle mode: {}", other)),
        }
    }
}

/// Validated request to start a new playback session
#[derive(Clone, PartialEq)]
pub struct PlaybackCommand {
    song: Option<Arc<Song>>,
    parent: Option<MusicParent>,
    queue: Vec<Arc<Song>>,
    shuffled: bool,
}

impl PlaybackCommand {
    fn new(
        song: Option<Arc<Song>>,
        parent: Option<MusicParent>,
        queue: Vec<Arc<Song>>,
        shuffled: bool,
    ) -> Option<Self> {
        if queue.is_empty() {
            return None;
        }
        if let Some(song) = &song {
            if !queue.contains(song) {
                return None;
            }
        }
        Some(Self {
            song,
            parent,
            queue,
            shuffled,
        })
    }

    /// Song to start at; `None` starts at the first (or a random) song
    pub fn song(&self) -> Option<&Arc<Song>> {
        self.song.as_ref()
    }

    /// Parent being played; `None` for "all songs" or an ad-hoc list
    pub fn parent(&self) -> Option<&MusicParent> {
        self.parent.as_ref()
    }

    /// Resolved queue in play order
    pub fn queue(&self) -> &[Arc<Song>] {
        &self.queue
    }

    pub fn shuffled(&self) -> bool {
        self.shuffled
    }
}

impl fmt::Debug for PlaybackCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PlaybackCommand")
            .field("song", &self.song.as_ref().map(|s| s.id))
            .field("parent", &self.parent.as_ref().map(|p| p.id()))
            .field("queue_len", &self.queue.len())
            .field("shuffled", &self.shuffled)
            .finish()
    }
}

/// Builds [`PlaybackCommand`]s against the current library and sort settings
#[derive(Debug, Clone)]
pub struct CommandFactory {
    music: MusicRepository,
    list_settings: ListSettings,
    keep_shuffle: bool,
    state: StateReader,
}

impl CommandFactory {
    pub fn new(
        music: MusicRepository,
        list_settings: ListSettings,
        keep_shuffle: bool,
        state: StateReader,
    ) -> Self {
        Self {
            music,
            list_settings,
            keep_shuffle,
            state,
        }
    }

    /// Play a single song on its own
    pub fn song(&self, song: Arc<Song>, shuffle: ShuffleMode) -> Option<PlaybackCommand> {
        PlaybackCommand::new(Some(song.clone()), None, vec![song], self.is_shuffled(shuffle))
    }

    /// Play a song from the whole library
    pub fn song_from_all(
        &self,
        song: Arc<Song>,
        shuffle: ShuffleMode,
    ) -> Option<PlaybackCommand> {
        self.from_library(Some(song), shuffle)
    }

    /// Play a song from its album
    pub fn song_from_album(
        &self,
        song: Arc<Song>,
        shuffle: ShuffleMode,
    ) -> Option<PlaybackCommand> {
        let library = self.music.library()?;
        let album = library.album(song.album)?;
        let sort = self.list_settings.album_songs;
        self.from_parent(Some(song), MusicParent::Album(album), sort, shuffle)
    }

    /// Play a song from one of its artists
    ///
    /// With no artist given, the song's artist is used if it has exactly one.
    pub fn song_from_artist(
        &self,
        song: Arc<Song>,
        artist: Option<Arc<Artist>>,
        shuffle: ShuffleMode,
    ) -> Option<PlaybackCommand> {
        let artist = match artist {
            Some(artist) => artist,
            None => match song.artists.as_slice() {
                [only] => self.music.library()?.artist(*only)?,
                _ => {
                    debug!(
                        "Song {} has {} artists, artist is ambiguous",
                        song.id,
                        song.artists.len()
                    );
                    return None;
                }
            },
        };
        let sort = self.list_settings.artist_songs;
        self.from_parent(Some(song), MusicParent::Artist(artist), sort, shuffle)
    }

    /// Play a song from one of its genres
    ///
    /// With no genre given, the song's genre is used if it has exactly one.
    pub fn song_from_genre(
        &self,
        song: Arc<Song>,
        genre: Option<Arc<Genre>>,
        shuffle: ShuffleMode,
    ) -> Option<PlaybackCommand> {
        let genre = match genre {
            Some(genre) => genre,
            None => match song.genres.as_slice() {
                [only] => self.music.library()?.genre(*only)?,
                _ => {
                    debug!(
                        "Song {} has {} genres, genre is ambiguous",
                        song.id,
                        song.genres.len()
                    );
                    return None;
                }
            },
        };
        let sort = self.list_settings.genre_songs;
        self.from_parent(Some(song), MusicParent::Genre(genre), sort, shuffle)
    }

    /// Play a song from a playlist, keeping the playlist's own order
    pub fn song_from_playlist(
        &self,
        song: Arc<Song>,
        playlist: Arc<Playlist>,
        shuffle: ShuffleMode,
    ) -> Option<PlaybackCommand> {
        let queue = playlist.songs.clone();
        PlaybackCommand::new(
            Some(song),
            Some(MusicParent::Playlist(playlist)),
            queue,
            self.is_shuffled(shuffle),
        )
    }

    /// Play the whole library
    pub fn all(&self, shuffle: ShuffleMode) -> Option<PlaybackCommand> {
        self.from_library(None, shuffle)
    }

    /// Play an ad-hoc list of songs as given
    pub fn songs(&self, songs: Vec<Arc<Song>>, shuffle: ShuffleMode) -> Option<PlaybackCommand> {
        PlaybackCommand::new(None, None, songs, self.is_shuffled(shuffle))
    }

    pub fn album(&self, album: Arc<Album>, shuffle: ShuffleMode) -> Option<PlaybackCommand> {
        let sort = self.list_settings.album_songs;
        self.from_parent(None, MusicParent::Album(album), sort, shuffle)
    }

    pub fn artist(&self, artist: Arc<Artist>, shuffle: ShuffleMode) -> Option<PlaybackCommand> {
        let sort = self.list_settings.artist_songs;
        self.from_parent(None, MusicParent::Artist(artist), sort, shuffle)
    }

    pub fn genre(&self, genre: Arc<Genre>, shuffle: ShuffleMode) -> Option<PlaybackCommand> {
        let sort = self.list_settings.genre_songs;
        self.from_parent(None, MusicParent::Genre(genre), sort, shuffle)
    }

    pub fn playlist(
        &self,
        playlist: Arc<Playlist>,
        shuffle: ShuffleMode,
    ) -> Option<PlaybackCommand> {
        let queue = playlist.songs.clone();
        let shuffled = self.is_shuffled(shuffle);
        PlaybackCommand::new(None, Some(MusicParent::Playlist(playlist)), queue, shuffled)
    }

    fn from_library(
        &self,
        song: Option<Arc<Song>>,
        shuffle: ShuffleMode,
    ) -> Option<PlaybackCommand> {
        let library = self.music.library()?;
        let queue = self.list_settings.songs.songs(library.songs().iter().cloned());
        PlaybackCommand::new(song, None, queue, self.is_shuffled(shuffle))
    }

    fn from_parent(
        &self,
        song: Option<Arc<Song>>,
        parent: MusicParent,
        sort: Sort,
        shuffle: ShuffleMode,
    ) -> Option<PlaybackCommand> {
        let queue = sort.songs(parent.songs().iter().cloned());
        let command = PlaybackCommand::new(song, Some(parent), queue, self.is_shuffled(shuffle));
        if command.is_none() {
            debug!("Parent scope did not resolve to a playable queue");
        }
        command
    }

    fn is_shuffled(&self, shuffle: ShuffleMode) -> bool {
        match shuffle {
            ShuffleMode::On => true,
            ShuffleMode::Off => false,
            ShuffleMode::Implicit => self.keep_shuffle && self.state.is_shuffled(),
        }
    }
}
