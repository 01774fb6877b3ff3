//! Scripted playback sessions
//!
//! A script is one command per line; blank lines and lines starting with `#`
//! are skipped. Commands address songs by id and queue positions by index in
//! the active order.
//!
//! ```text
//! play 6f1c...e2 album
//! play-next 0b7d...41 9a22...c3
//! shuffle on
//! track-ended
//! ```

use crate::error::{Error, Result};
use crate::playback::{
    CommandFactory, DeferredPlayback, EngineEvent, HolderHandle, PlaybackStateManager,
    RepeatMode, ShuffleMode,
};
use encore_common::{MusicRepository, Song, SongId};
use std::str::FromStr;
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ScriptError {
    #[error("unknown command '{0}'")]
    UnknownCommand(String),

    #[error("'{command}' is missing {argument}")]
    MissingArgument {
        command: String,
        argument: &'static str,
    },

    #[error("'{command}' got invalid argument '{value}'")]
    InvalidArgument { command: String, value: String },

    #[error("line {line}: {source}")]
    AtLine {
        line: usize,
        #[source]
        source: Box<ScriptError>,
    },
}

/// Which songs surround the song being played
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayFrom {
    Song,
    All,
    Album,
    Artist,
    Genre,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptCommand {
    ShuffleAll,
    Play { song: SongId, from: PlayFrom },
    PlayNext(Vec<SongId>),
    Add(Vec<SongId>),
    Move { from: usize, to: usize },
    Remove(usize),
    Goto(usize),
    Next,
    Prev,
    Pause,
    Resume,
    Seek(u64),
    Shuffle(bool),
    Repeat(RepeatMode),
    Open(String),
    Restore,
    End,
    Reset,
    TrackEnded,
}

fn invalid(command: &str, value: &str) -> ScriptError {
    ScriptError::InvalidArgument {
        command: command.to_string(),
        value: value.to_string(),
    }
}

fn required<'a>(
    command: &str,
    args: &mut impl Iterator<Item = &'a str>,
    argument: &'static str,
) -> std::result::Result<&'a str, ScriptError> {
    args.next().ok_or_else(|| ScriptError::MissingArgument {
        command: command.to_string(),
        argument,
    })
}

fn parse_arg<T: FromStr>(command: &str, value: &str) -> std::result::Result<T, ScriptError> {
    value.parse().map_err(|_| invalid(command, value))
}

/// Next argument, parsed
fn required_arg<'a, T: FromStr>(
    command: &str,
    args: &mut impl Iterator<Item = &'a str>,
    argument: &'static str,
) -> std::result::Result<T, ScriptError> {
    parse_arg(command, required(command, args, argument)?)
}

fn parse_song_id(command: &str, value: &str) -> std::result::Result<SongId, ScriptError> {
    Uuid::parse_str(value).map(SongId::from).map_err(|_| invalid(command, value))
}

fn parse_song_ids<'a>(
    command: &str,
    args: impl Iterator<Item = &'a str>,
) -> std::result::Result<Vec<SongId>, ScriptError> {
    let ids = args
        .map(|value| parse_song_id(command, value))
        .collect::<std::result::Result<Vec<_>, _>>()?;
    if ids.is_empty() {
        return Err(ScriptError::MissingArgument {
            command: command.to_string(),
            argument: "song ids",
        });
    }
    Ok(ids)
}

impl FromStr for ScriptCommand {
    type Err = ScriptError;

    fn from_str(line: &str) -> std::result::Result<Self, Self::Err> {
        let mut args = line.split_whitespace();
        let command = args.next().unwrap_or_default();

        let parsed = match command {
            "shuffle-all" => ScriptCommand::ShuffleAll,
            "play" => {
                let song = parse_song_id(command, required(command, &mut args, "a song id")?)?;
                let from = match args.next() {
                    None => PlayFrom::Song,
                    Some("all") => PlayFrom::All,
                    Some("album") => PlayFrom::Album,
                    Some("artist") => PlayFrom::Artist,
                    Some("genre") => PlayFrom::Genre,
                    Some(other) => return Err(invalid(command, other)),
                };
                ScriptCommand::Play { song, from }
            }
            "play-next" => ScriptCommand::PlayNext(parse_song_ids(command, args.by_ref())?),
            "add" => ScriptCommand::Add(parse_song_ids(command, args.by_ref())?),
            "move" => {
                let from = required_arg(command, &mut args, "a source index")?;
                let to = required_arg(command, &mut args, "a destination index")?;
                ScriptCommand::Move { from, to }
            }
            "remove" => ScriptCommand::Remove(required_arg(command, &mut args, "an index")?),
            "goto" => ScriptCommand::Goto(required_arg(command, &mut args, "an index")?),
            "next" => ScriptCommand::Next,
            "prev" => ScriptCommand::Prev,
            "pause" => ScriptCommand::Pause,
            "resume" => ScriptCommand::Resume,
            "seek" => ScriptCommand::Seek(required_arg(command, &mut args, "a position")?),
            "shuffle" => match required(command, &mut args, "on or off")? {
                "on" => ScriptCommand::Shuffle(true),
                "off" => ScriptCommand::Shuffle(false),
                other => return Err(invalid(command, other)),
            },
            "repeat" => ScriptCommand::Repeat(required_arg(command, &mut args, "a mode")?),
            "open" => ScriptCommand::Open(required(command, &mut args, "a uri")?.to_string()),
            "restore" => ScriptCommand::Restore,
            "end" => ScriptCommand::End,
            "reset" => ScriptCommand::Reset,
            "track-ended" => ScriptCommand::TrackEnded,
            other => return Err(ScriptError::UnknownCommand(other.to_string())),
        };

        if let Some(extra) = args.next() {
            return Err(invalid(command, extra));
        }
        Ok(parsed)
    }
}

/// Parse a whole script, keeping 1-based line numbers
pub fn parse_script(text: &str) -> std::result::Result<Vec<(usize, ScriptCommand)>, ScriptError> {
    text.lines()
        .enumerate()
        .map(|(i, line)| (i + 1, line.trim()))
        .filter(|(_, line)| !line.is_empty() && !line.starts_with('#'))
        .map(|(line, text)| {
            text.parse()
                .map(|command| (line, command))
                .map_err(|e| ScriptError::AtLine {
                    line,
                    source: Box::new(e),
                })
        })
        .collect()
}

/// Drives a manager from script commands
pub struct Replay {
    manager: Arc<PlaybackStateManager>,
    handle: HolderHandle,
    factory: CommandFactory,
    music: MusicRepository,
}

impl Replay {
    pub fn new(
        manager: Arc<PlaybackStateManager>,
        handle: HolderHandle,
        factory: CommandFactory,
        music: MusicRepository,
    ) -> Self {
        Self {
            manager,
            handle,
            factory,
            music,
        }
    }

    fn song(&self, id: SongId) -> Result<Arc<Song>> {
        self.music
            .library()
            .and_then(|library| library.find_song(id))
            .ok_or_else(|| encore_common::Error::NotFound(format!("song {}", id)).into())
    }

    fn songs(&self, ids: &[SongId]) -> Result<Vec<Arc<Song>>> {
        ids.iter().map(|id| self.song(*id)).collect()
    }

    pub async fn run(&self, command: &ScriptCommand) -> Result<()> {
        let manager = &self.manager;
        match command {
            ScriptCommand::ShuffleAll => {
                manager.play_deferred(DeferredPlayback::ShuffleAll).await;
                Ok(())
            }
            ScriptCommand::Play { song, from } => {
                let song = self.song(*song)?;
                let mode = ShuffleMode::Implicit;
                let command = match from {
                    PlayFrom::Song => self.factory.song(song, mode),
                    PlayFrom::All => self.factory.song_from_all(song, mode),
                    PlayFrom::Album => self.factory.song_from_album(song, mode),
                    PlayFrom::Artist => self.factory.song_from_artist(song, None, mode),
                    PlayFrom::Genre => self.factory.song_from_genre(song, None, mode),
                };
                let command = command.ok_or_else(|| {
                    Error::InvalidState(format!("Cannot build a {:?} playback for this song", from))
                })?;
                manager.new_playback(command).await
            }
            ScriptCommand::PlayNext(ids) => manager.play_next(self.songs(ids)?).await,
            ScriptCommand::Add(ids) => manager.add_to_queue(self.songs(ids)?).await,
            ScriptCommand::Move { from, to } => manager.move_song(*from, *to).await,
            ScriptCommand::Remove(at) => manager.remove(*at).await,
            ScriptCommand::Goto(index) => manager.goto(*index).await,
            ScriptCommand::Next => manager.next().await,
            ScriptCommand::Prev => manager.prev().await,
            ScriptCommand::Pause => manager.playing(false).await,
            ScriptCommand::Resume => manager.playing(true).await,
            ScriptCommand::Seek(position_ms) => manager.seek_to(*position_ms).await,
            ScriptCommand::Shuffle(shuffled) => manager.shuffled(*shuffled).await,
            ScriptCommand::Repeat(mode) => manager.set_repeat_mode(*mode).await,
            ScriptCommand::Open(uri) => {
                manager.play_deferred(DeferredPlayback::OpenUri { uri: uri.clone() }).await;
                Ok(())
            }
            ScriptCommand::Restore => {
                manager.play_deferred(DeferredPlayback::RestoreSavedState { play: false }).await;
                Ok(())
            }
            ScriptCommand::End => manager.end_session().await,
            ScriptCommand::Reset => manager.reset().await,
            ScriptCommand::TrackEnded => {
                manager.on_engine_event(self.handle, EngineEvent::TrackEnded).await
            }
        }
    }
}
