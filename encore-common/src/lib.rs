//! # Encore Common Library
//!
//! Shared code for the Encore playback workspace:
//! - Music model (songs, albums, artists, genres, playlists)
//! - Read-only library lookups and sort orders
//! - Configuration loading
//! - Error types and timestamp helpers

pub mod config;
pub mod error;
pub mod library;
pub mod music;
pub mod sort;
pub mod time;

pub use config::{EncoreConfig, LoggingConfig, PersistenceConfig, PlaybackSettings};
pub use error::{Error, Result};
pub use library::{Library, LibraryRecords, MusicRepository};
pub use music::{
    Album, AlbumId, Artist, ArtistId, Genre, GenreId, MusicParent, ParentId, ParentKind, Playlist,
    PlaylistId, Song, SongId,
};
pub use sort::{ListSettings, Sort, SortDirection, SortMode};
