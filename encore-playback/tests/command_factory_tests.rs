//! Playback command construction tests

mod helpers;

use encore_common::library::ParentRecord;
use encore_common::{
    AlbumId, ArtistId, GenreId, Library, LibraryRecords, ListSettings, MusicRepository, ParentKind,
    PlaylistId, Song,
};
use encore_playback::playback::{
    CommandFactory, PlaybackCommand, PlaybackSnapshot, Queue, ShuffleMode, StateReader,
};
use helpers::{make_song, titles};
use std::sync::Arc;

struct Fixture {
    music: MusicRepository,
    x: ArtistId,
    y: ArtistId,
    playlist: PlaylistId,
}

impl Fixture {
    fn new() -> Self {
        let album = AlbumId::new_v4();
        let (x, y) = (ArtistId::new_v4(), ArtistId::new_v4());
        let (g1, g2) = (GenreId::new_v4(), GenreId::new_v4());
        let playlist = PlaylistId::new_v4();

        let song =
            |title: &str, track: u32, year: i32, artists: Vec<ArtistId>, genres: Vec<GenreId>| {
                let mut song = make_song(title, album, track);
                song.year = Some(year);
                song.artists = artists;
                song.genres = genres;
                song
            };
        let one = song("One", 1, 2001, vec![x], vec![g1]);
        let two = song("Two", 2, 2003, vec![x, y], vec![g1]);
        let three = song("Three", 3, 2002, vec![x], vec![g1, g2]);
        // Claims the album, but the album's track list does not include it
        let stray = song("Stray", 4, 1999, vec![y], vec![]);

        let records = LibraryRecords {
            albums: vec![ParentRecord {
                id: album,
                name: "Album".to_string(),
                songs: vec![one.id, two.id, three.id],
            }],
            artists: vec![
                ParentRecord {
                    id: x,
                    name: "X".to_string(),
                    songs: vec![one.id, two.id, three.id],
                },
                ParentRecord {
                    id: y,
                    name: "Y".to_string(),
                    songs: vec![two.id, stray.id],
                },
            ],
            genres: vec![
                ParentRecord {
                    id: g1,
                    name: "G1".to_string(),
                    songs: vec![one.id, two.id, three.id],
                },
                ParentRecord {
                    id: g2,
                    name: "G2".to_string(),
                    songs: vec![three.id],
                },
            ],
            playlists: vec![ParentRecord {
                id: playlist,
                name: "Mix".to_string(),
                songs: vec![three.id, one.id],
            }],
            songs: vec![one, two, three, stray],
        };
        let library = Library::new(records).unwrap();

        Self {
            music: MusicRepository::with_library(library),
            x,
            y,
            playlist,
        }
    }

    fn factory(&self, keep_shuffle: bool, state: StateReader) -> CommandFactory {
        CommandFactory::new(self.music.clone(), ListSettings::default(), keep_shuffle, state)
    }

    fn unshuffled(&self) -> CommandFactory {
        self.factory(true, StateReader::detached(PlaybackSnapshot::empty()))
    }

    fn song(&self, title: &str) -> Arc<Song> {
        let library = self.music.library().unwrap();
        library.songs().iter().find(|s| s.title == title).cloned().unwrap()
    }
}

fn queue_titles(command: &PlaybackCommand) -> Vec<String> {
    titles(command.queue())
}

#[test]
fn test_song_from_album_uses_track_order() {
    let f = Fixture::new();

    let command = f.unshuffled().song_from_album(f.song("Two"), ShuffleMode::Off).unwrap();

    assert_eq!(queue_titles(&command), ["One", "Two", "Three"]);
    assert_eq!(command.song().unwrap().title, "Two");
    assert_eq!(command.parent().unwrap().kind(), ParentKind::Album);
    assert!(!command.shuffled());
}

#[test]
fn test_song_missing_from_its_album_is_rejected() {
    let f = Fixture::new();

    assert!(f.unshuffled().song_from_album(f.song("Stray"), ShuffleMode::Off).is_none());
}

#[test]
fn test_song_from_artist_needs_an_unambiguous_artist() {
    let f = Fixture::new();
    let factory = f.unshuffled();

    assert!(factory.song_from_artist(f.song("Two"), None, ShuffleMode::Off).is_none());

    let y = f.music.library().unwrap().artist(f.y).unwrap();
    let command = factory.song_from_artist(f.song("Two"), Some(y), ShuffleMode::Off).unwrap();
    assert_eq!(command.parent().unwrap().name(), "Y");
    assert_eq!(queue_titles(&command), ["Two", "Stray"]);

    // Newest first
    let command = factory.song_from_artist(f.song("One"), None, ShuffleMode::Off).unwrap();
    assert_eq!(command.parent().unwrap().name(), "X");
    assert_eq!(queue_titles(&command), ["Two", "Three", "One"]);
    assert_eq!(command.parent().unwrap().id().id, f.x.0);
}

#[test]
fn test_song_from_genre_needs_an_unambiguous_genre() {
    let f = Fixture::new();
    let factory = f.unshuffled();

    assert!(factory.song_from_genre(f.song("Three"), None, ShuffleMode::Off).is_none());

    let command = factory.song_from_genre(f.song("One"), None, ShuffleMode::Off).unwrap();
    assert_eq!(command.parent().unwrap().name(), "G1");
    assert_eq!(queue_titles(&command), ["One", "Three", "Two"]);
}

#[test]
fn test_playlist_keeps_its_own_order() {
    let f = Fixture::new();
    let playlist = f.music.library().unwrap().playlist(f.playlist).unwrap();

    let command = f
        .unshuffled()
        .song_from_playlist(f.song("One"), playlist.clone(), ShuffleMode::Off)
        .unwrap();
    assert_eq!(queue_titles(&command), ["Three", "One"]);

    assert!(f
        .unshuffled()
        .song_from_playlist(f.song("Two"), playlist, ShuffleMode::Off)
        .is_none());
}

#[test]
fn test_all_sorts_library_by_name() {
    let f = Fixture::new();

    let command = f.unshuffled().all(ShuffleMode::Off).unwrap();

    assert_eq!(queue_titles(&command), ["One", "Stray", "Three", "Two"]);
    assert!(command.song().is_none());
    assert!(command.parent().is_none());
}

#[test]
fn test_empty_list_builds_no_command() {
    let f = Fixture::new();

    assert!(f.unshuffled().songs(Vec::new(), ShuffleMode::On).is_none());
    assert!(CommandFactory::new(
        MusicRepository::new(),
        ListSettings::default(),
        true,
        StateReader::detached(PlaybackSnapshot::empty()),
    )
    .all(ShuffleMode::Off)
    .is_none());
}

#[test]
fn test_implicit_shuffle_follows_current_state() {
    let f = Fixture::new();
    let mut queue = Queue::with_seed(5);
    queue.start(None, vec![f.song("One"), f.song("Two")], true).unwrap();
    let shuffled = PlaybackSnapshot {
        queue: queue.to_raw(),
        ..PlaybackSnapshot::empty()
    };

    let keeping = f.factory(true, StateReader::detached(shuffled.clone()));
    assert!(keeping.song_from_album(f.song("One"), ShuffleMode::Implicit).unwrap().shuffled());
    assert!(!keeping.song_from_album(f.song("One"), ShuffleMode::Off).unwrap().shuffled());

    let not_keeping = f.factory(false, StateReader::detached(shuffled));
    assert!(!not_keeping.song_from_album(f.song("One"), ShuffleMode::Implicit).unwrap().shuffled());
    assert!(not_keeping.song_from_album(f.song("One"), ShuffleMode::On).unwrap().shuffled());

    let unshuffled = f.unshuffled();
    assert!(!unshuffled.song_from_album(f.song("One"), ShuffleMode::Implicit).unwrap().shuffled());
}
