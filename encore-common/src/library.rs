//! Read-only music library
//!
//! The playback core never mutates the library. It resolves songs and parent
//! membership through [`Library`] and learns whether a library is loaded at all
//! through [`MusicRepository`].

use crate::error::{Error, Result};
use crate::music::{
    Album, AlbumId, Artist, ArtistId, Genre, GenreId, MusicParent, ParentId, ParentKind, Playlist,
    PlaylistId, Song, SongId,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, RwLock};
use tracing::{debug, info};
use uuid::Uuid;

/// Parent record with an explicit member list
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParentRecord<I> {
    pub id: I,
    pub name: String,
    #[serde(default)]
    pub songs: Vec<SongId>,
}

/// Serializable library contents
///
/// Parent membership is taken from each parent's `songs` list as-is and is not
/// cross-checked against the songs' own album/artist/genre fields.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LibraryRecords {
    pub songs: Vec<Song>,
    #[serde(default)]
    pub albums: Vec<ParentRecord<AlbumId>>,
    #[serde(default)]
    pub artists: Vec<ParentRecord<ArtistId>>,
    #[serde(default)]
    pub genres: Vec<ParentRecord<GenreId>>,
    #[serde(default)]
    pub playlists: Vec<ParentRecord<PlaylistId>>,
}

/// Immutable snapshot of the music library
#[derive(Debug)]
pub struct Library {
    songs: Vec<Arc<Song>>,
    songs_by_id: HashMap<SongId, Arc<Song>>,
    albums: HashMap<AlbumId, Arc<Album>>,
    artists: HashMap<ArtistId, Arc<Artist>>,
    genres: HashMap<GenreId, Arc<Genre>>,
    playlists: HashMap<PlaylistId, Arc<Playlist>>,
}

impl Library {
    /// Build a library, rejecting records that reference unknown song ids
    pub fn new(records: LibraryRecords) -> Result<Self> {
        let mut songs = Vec::with_capacity(records.songs.len());
        let mut songs_by_id = HashMap::with_capacity(records.songs.len());
        for song in records.songs {
            let song = Arc::new(song);
            if songs_by_id.insert(song.id, song.clone()).is_some() {
                return Err(Error::InvalidInput(format!("Duplicate song id {}", song.id)));
            }
            songs.push(song);
        }

        let resolve = |kind: &str, name: &str, ids: &[SongId]| -> Result<Vec<Arc<Song>>> {
            ids.iter()
                .map(|id| {
                    songs_by_id.get(id).cloned().ok_or_else(|| {
                        Error::InvalidInput(format!(
                            "{} '{}' references unknown song {}",
                            kind, name, id
                        ))
                    })
                })
                .collect()
        };

        let mut albums = HashMap::new();
        for record in &records.albums {
            let songs = resolve("Album", &record.name, &record.songs)?;
            albums.insert(
                record.id,
                Arc::new(Album {
                    id: record.id,
                    name: record.name.clone(),
                    songs,
                }),
            );
        }
        let mut artists = HashMap::new();
        for record in &records.artists {
            let songs = resolve("Artist", &record.name, &record.songs)?;
            artists.insert(
                record.id,
                Arc::new(Artist {
                    id: record.id,
                    name: record.name.clone(),
                    songs,
                }),
            );
        }
        let mut genres = HashMap::new();
        for record in &records.genres {
            let songs = resolve("Genre", &record.name, &record.songs)?;
            genres.insert(
                record.id,
                Arc::new(Genre {
                    id: record.id,
                    name: record.name.clone(),
                    songs,
                }),
            );
        }
        let mut playlists = HashMap::new();
        for record in &records.playlists {
            let songs = resolve("Playlist", &record.name, &record.songs)?;
            playlists.insert(
                record.id,
                Arc::new(Playlist {
                    id: record.id,
                    name: record.name.clone(),
                    songs,
                }),
            );
        }

        debug!(
            songs = songs.len(),
            albums = albums.len(),
            artists = artists.len(),
            genres = genres.len(),
            playlists = playlists.len(),
            "Built library"
        );

        Ok(Self {
            songs,
            songs_by_id,
            albums,
            artists,
            genres,
            playlists,
        })
    }

    /// Load library records from a JSON file
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let records: LibraryRecords = serde_json::from_str(&content)?;
        info!("Loaded library records from {}", path.display());
        Self::new(records)
    }

    /// Every song, in library order
    pub fn songs(&self) -> &[Arc<Song>] {
        &self.songs
    }

    pub fn is_empty(&self) -> bool {
        self.songs.is_empty()
    }

    pub fn find_song(&self, id: SongId) -> Option<Arc<Song>> {
        self.songs_by_id.get(&id).cloned()
    }

    pub fn album(&self, id: AlbumId) -> Option<Arc<Album>> {
        self.albums.get(&id).cloned()
    }

    pub fn artist(&self, id: ArtistId) -> Option<Arc<Artist>> {
        self.artists.get(&id).cloned()
    }

    pub fn genre(&self, id: GenreId) -> Option<Arc<Genre>> {
        self.genres.get(&id).cloned()
    }

    pub fn playlist(&self, id: PlaylistId) -> Option<Arc<Playlist>> {
        self.playlists.get(&id).cloned()
    }

    /// Resolve a persisted parent reference
    pub fn find_parent(&self, id: ParentId) -> Option<MusicParent> {
        match id.kind {
            ParentKind::Album => self.album(AlbumId(id.id)).map(MusicParent::Album),
            ParentKind::Artist => self.artist(ArtistId(id.id)).map(MusicParent::Artist),
            ParentKind::Genre => self.genre(GenreId(id.id)).map(MusicParent::Genre),
            ParentKind::Playlist => self.playlist(PlaylistId(id.id)).map(MusicParent::Playlist),
        }
    }

    /// Find the song an external URI points at
    ///
    /// Matches the song's own URI first, then falls back to a `song:<uuid>` form.
    pub fn find_song_for_uri(&self, uri: &str) -> Option<Arc<Song>> {
        if let Some(song) = self.songs.iter().find(|song| song.uri == uri) {
            return Some(song.clone());
        }
        uri.strip_prefix("song:")
            .and_then(|raw| Uuid::parse_str(raw).ok())
            .and_then(|uuid| self.find_song(SongId(uuid)))
    }
}

/// Holder of the currently loaded library
///
/// `None` until the library finishes loading. Cheap to clone.
#[derive(Debug, Clone, Default)]
pub struct MusicRepository {
    inner: Arc<RwLock<Option<Arc<Library>>>>,
}

impl MusicRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a repository with a library already loaded
    pub fn with_library(library: Library) -> Self {
        let repository = Self::new();
        repository.set_library(Some(Arc::new(library)));
        repository
    }

    /// The current library, if loaded
    pub fn library(&self) -> Option<Arc<Library>> {
        match self.inner.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Replace the current library
    pub fn set_library(&self, library: Option<Arc<Library>>) {
        let mut guard = match self.inner.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        *guard = library;
    }
}
