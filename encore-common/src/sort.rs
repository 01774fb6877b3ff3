//! Sort orders for song lists
//!
//! Sorting is stable, so songs that compare equal keep the order the library
//! supplied them in.

use crate::music::Song;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::sync::Arc;

/// Sort key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortMode {
    /// Title, case-insensitive
    Name,
    /// Release year; songs without a year sort first
    Date,
    Duration,
    /// Disc number, then track number
    Track,
}

/// Sort direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Ascending,
    Descending,
}

/// A sort order applied to song lists
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sort {
    pub mode: SortMode,
    pub direction: SortDirection,
}

impl Sort {
    pub const fn new(mode: SortMode, direction: SortDirection) -> Self {
        Self {
            mode,
            direction,
        }
    }

    /// Sort the given songs into a new list
    pub fn songs<I>(&self, songs: I) -> Vec<Arc<Song>>
    where
        I: IntoIterator<Item = Arc<Song>>,
    {
        let mut songs: Vec<Arc<Song>> = songs.into_iter().collect();
        songs.sort_by(|a, b| {
            let ordering = self.compare(a, b);
            match self.direction {
                SortDirection::Ascending => ordering,
                SortDirection::Descending => ordering.reverse(),
            }
        });
        songs
    }

    fn compare(&self, a: &Song, b: &Song) -> Ordering {
        match self.mode {
            SortMode::Name => a.title.to_lowercase().cmp(&b.title.to_lowercase()),
            SortMode::Date => a.year.cmp(&b.year),
            SortMode::Duration => a.duration_ms.cmp(&b.duration_ms),
            SortMode::Track => (a.disc, a.track).cmp(&(b.disc, b.track)),
        }
    }
}

/// Configured sort orders, one per list type
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListSettings {
    /// Library-wide song list
    #[serde(default = "default_song_sort")]
    pub songs: Sort,
    #[serde(default = "default_track_sort")]
    pub album_songs: Sort,
    #[serde(default = "default_date_sort")]
    pub artist_songs: Sort,
    #[serde(default = "default_song_sort")]
    pub genre_songs: Sort,
}

fn default_song_sort() -> Sort {
    Sort::new(SortMode::Name, SortDirection::Ascending)
}

fn default_track_sort() -> Sort {
    Sort::new(SortMode::Track, SortDirection::Ascending)
}

fn default_date_sort() -> Sort {
    Sort::new(SortMode::Date, SortDirection::Descending)
}

impl Default for ListSettings {
    fn default() -> Self {
        Self {
            songs: default_song_sort(),
            album_songs: default_track_sort(),
            artist_songs: default_date_sort(),
            genre_songs: default_song_sort(),
        }
    }
}
