//! Music model shared by the library and the playback core
//!
//! Songs are immutable and shared as `Arc<Song>`. Equality and hashing are by
//! id only, so two handles to the same song always compare equal regardless of
//! which library snapshot produced them.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use uuid::Uuid;

macro_rules! music_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub Uuid);

        impl $name {
            /// Generate a fresh random id
            pub fn new_v4() -> Self {
                Self(Uuid::new_v4())
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                self.0.fmt(f)
            }
        }

        impl From<Uuid> for $name {
            fn from(uuid: Uuid) -> Self {
                Self(uuid)
            }
        }
    };
}

music_id!(
    /// Unique identifier of a [`Song`]
    SongId
);
music_id!(
    /// Unique identifier of an [`Album`]
    AlbumId
);
music_id!(
    /// Unique identifier of an [`Artist`]
    ArtistId
);
music_id!(
    /// Unique identifier of a [`Genre`]
    GenreId
);
music_id!(
    /// Unique identifier of a [`Playlist`]
    PlaylistId
);

/// A playable item
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Song {
    pub id: SongId,
    pub title: String,
    /// Location the audio engine loads the song from
    pub uri: String,
    pub duration_ms: u64,
    pub album: AlbumId,
    #[serde(default)]
    pub artists: Vec<ArtistId>,
    #[serde(default)]
    pub genres: Vec<GenreId>,
    #[serde(default)]
    pub disc: Option<u32>,
    #[serde(default)]
    pub track: Option<u32>,
    #[serde(default)]
    pub year: Option<i32>,
}

impl PartialEq for Song {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Song {}

impl Hash for Song {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

/// An album and its member songs
#[derive(Debug, Clone)]
pub struct Album {
    pub id: AlbumId,
    pub name: String,
    pub songs: Vec<Arc<Song>>,
}

/// An artist and its member songs
#[derive(Debug, Clone)]
pub struct Artist {
    pub id: ArtistId,
    pub name: String,
    pub songs: Vec<Arc<Song>>,
}

/// A genre and its member songs
#[derive(Debug, Clone)]
pub struct Genre {
    pub id: GenreId,
    pub name: String,
    pub songs: Vec<Arc<Song>>,
}

/// A user playlist; song order is significant and never re-sorted
#[derive(Debug, Clone)]
pub struct Playlist {
    pub id: PlaylistId,
    pub name: String,
    pub songs: Vec<Arc<Song>>,
}

/// The kind of a [`MusicParent`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParentKind {
    Album,
    Artist,
    Genre,
    Playlist,
}

impl fmt::Display for ParentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParentKind::Album => write!(f, "album"),
            ParentKind::Artist => write!(f, "artist"),
            ParentKind::Genre => write!(f, "genre"),
            ParentKind::Playlist => write!(f, "playlist"),
        }
    }
}

/// Serializable reference to a [`MusicParent`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ParentId {
    pub kind: ParentKind,
    pub id: Uuid,
}

impl fmt::Display for ParentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind, self.id)
    }
}

/// A collection songs can be played from
#[derive(Debug, Clone)]
pub enum MusicParent {
    Album(Arc<Album>),
    Artist(Arc<Artist>),
    Genre(Arc<Genre>),
    Playlist(Arc<Playlist>),
}

impl MusicParent {
    pub fn kind(&self) -> ParentKind {
        match self {
            MusicParent::Album(_) => ParentKind::Album,
            MusicParent::Artist(_) => ParentKind::Artist,
            MusicParent::Genre(_) => ParentKind::Genre,
            MusicParent::Playlist(_) => ParentKind::Playlist,
        }
    }

    pub fn id(&self) -> ParentId {
        let id = match self {
            MusicParent::Album(album) => album.id.0,
            MusicParent::Artist(artist) => artist.id.0,
            MusicParent::Genre(genre) => genre.id.0,
            MusicParent::Playlist(playlist) => playlist.id.0,
        };
        ParentId {
            kind: self.kind(),
            id,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            MusicParent::Album(album) => &album.name,
            MusicParent::Artist(artist) => &artist.name,
            MusicParent::Genre(genre) => &genre.name,
            MusicParent::Playlist(playlist) => &playlist.name,
        }
    }

    /// Member songs in library order
    pub fn songs(&self) -> &[Arc<Song>] {
        match self {
            MusicParent::Album(album) => &album.songs,
            MusicParent::Artist(artist) => &artist.songs,
            MusicParent::Genre(genre) => &genre.songs,
            MusicParent::Playlist(playlist) => &playlist.songs,
        }
    }
}

impl PartialEq for MusicParent {
    fn eq(&self, other: &Self) -> bool {
        self.id() == other.id()
    }
}

impl Eq for MusicParent {}

#[cfg(test)]
mod tests {
    use super::*;

    fn song(title: &str) -> Song {
        Song {
            id: SongId::new_v4(),
            title: title.to_string(),
            uri: format!("file:///music/{}.flac", title),
            duration_ms: 180_000,
            album: AlbumId::new_v4(),
            artists: Vec::new(),
            genres: Vec::new(),
            disc: None,
            track: None,
            year: None,
        }
    }

    #[test]
    fn test_song_equality_is_by_id() {
        let a = song("a");
        let mut renamed = a.clone();
        renamed.title = "something else".to_string();
        assert_eq!(a, renamed);
        assert_ne!(a, song("a"));
    }

    #[test]
    fn test_parent_id_round_trips_kind() {
        let album = Arc::new(Album {
            id: AlbumId::new_v4(),
            name: "Album".to_string(),
            songs: vec![Arc::new(song("x"))],
        });
        let parent = MusicParent::Album(album.clone());
        assert_eq!(parent.kind(), ParentKind::Album);
        assert_eq!(parent.id().id, album.id.0);
        assert_eq!(parent.songs().len(), 1);
        assert_eq!(parent.name(), "Album");
    }

    #[test]
    fn test_parent_id_display() {
        let id = ParentId {
            kind: ParentKind::Genre,
            id: Uuid::nil(),
        };
        assert_eq!(id.to_string(), format!("genre:{}", Uuid::nil()));
    }
}
