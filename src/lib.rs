//! awesome_sound: core library for a local music player with synced lyrics.
//!
//! Playlist, playback state, lyrics, settings and library management live
//! here. The `awesomesound` CLI and the integration tests drive it through
//! [`app_core::AppCore`].

pub mod app_core;
pub mod config;
pub mod error;
pub mod library;
pub mod logbook;
pub mod lyric_creator;
pub mod lyrics;
pub mod player;
pub mod playlist;
pub mod search;
pub mod track;
pub mod trim;

pub use error::{Error, Result};
