//! Error types shared across the player core.

use std::path::PathBuf;
use thiserror::Error;

/// Failures of the settings file store.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file '{0}' does not exist; call init() first")]
    MissingFile(PathBuf),
    #[error("key `{key}` {reason}")]
    KeyConflict { key: String, reason: &'static str },
    #[error("invalid value for `{key}`: {reason}")]
    InvalidValue { key: String, reason: String },
    #[error("config I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("config file is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

impl ConfigError {
    pub(crate) fn key_exists(key: &str) -> Self {
        ConfigError::KeyConflict {
            key: key.to_string(),
            reason: "already exists; use edit() to change it",
        }
    }

    pub(crate) fn key_missing(key: &str) -> Self {
        ConfigError::KeyConflict {
            key: key.to_string(),
            reason: "does not exist; use add() to insert it",
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PlaylistError {
    #[error("playlist index {index} out of range (playlist has {len} tracks)")]
    IndexOutOfRange { index: i64, len: usize },
    #[error("resume track '{0}' is not in the playlist")]
    ResumeNotFound(String),
    #[error("track '{0}' is not in the new track list")]
    TrackMissing(String),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PlayerError {
    #[error("volume must remain between 0 - 100, it cannot be {0}")]
    VolumeOutOfRange(i64),
    #[error("cannot swap in an empty playlist")]
    InvalidPlaylist,
    #[error(transparent)]
    Playlist(#[from] PlaylistError),
    #[error("media engine error: {0}")]
    Engine(String),
}

#[derive(Debug, Error)]
pub enum LyricsError {
    #[error("malformed lyrics at line {line}: {reason}")]
    Parse { line: usize, reason: String },
    #[error("lyric line must start before it stops ({start:?} >= {stop:?})")]
    InvalidRange {
        start: std::time::Duration,
        stop: std::time::Duration,
    },
    #[error("lyrics I/O error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Error)]
pub enum LibraryError {
    #[error("song '{0}' not found")]
    NotFound(String),
    #[error("song '{0}' already exists")]
    AlreadyExists(String),
    #[error("unsupported file type '{0}'")]
    Unsupported(String),
    #[error("'{0}' is not a valid song name")]
    InvalidName(String),
    #[error("refusing to delete the last remaining songs")]
    TooFewSongs,
    #[error("library I/O error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Error)]
pub enum TrimError {
    #[error("trim start must be before its stop ({start:?} >= {stop:?})")]
    InvalidRange {
        start: std::time::Duration,
        stop: std::time::Duration,
    },
    #[error("failed to launch ffmpeg: {0}")]
    Launch(#[from] std::io::Error),
    #[error("ffmpeg exited with status {0}")]
    Failed(i32),
}

/// Top-level error returned by [`crate::app_core::AppCore`].
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Playlist(#[from] PlaylistError),
    #[error(transparent)]
    Player(#[from] PlayerError),
    #[error(transparent)]
    Lyrics(#[from] LyricsError),
    #[error(transparent)]
    Library(#[from] LibraryError),
    #[error(transparent)]
    Trim(#[from] TrimError),
    #[error("no songs found in '{0}'")]
    NoSongs(PathBuf),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
