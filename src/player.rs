use crate::error::PlayerError;
use crate::playlist::Playlist;
use rodio::{Decoder, OutputStream, OutputStreamHandle, Sink};
use std::fmt;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::time::Duration;

/// Playback/volume/mute state layered over the playlist.
///
/// The flags here are bookkeeping only: the caller keeps a [`MediaEngine`]
/// in step with them.
#[derive(Debug, Clone)]
pub struct MusicPlayer {
    playlist: Playlist,
    is_playing: bool,
    is_muted: bool,
    volume: u8,
}

impl MusicPlayer {
    pub fn new(playlist: Playlist, is_muted: bool, volume: i64) -> Result<Self, PlayerError> {
        let volume = check_volume(volume)?;
        Ok(MusicPlayer {
            playlist,
            is_playing: false,
            is_muted,
            volume,
        })
    }

    pub fn playlist(&self) -> &Playlist {
        &self.playlist
    }

    pub fn playlist_mut(&mut self) -> &mut Playlist {
        &mut self.playlist
    }

    pub fn is_playing(&self) -> bool {
        self.is_playing
    }

    pub fn is_muted(&self) -> bool {
        self.is_muted
    }

    pub fn volume(&self) -> u8 {
        self.volume
    }

    /// True exactly when playing; lets callers branch on `player.is_active()`
    /// the same way they would on a bare flag.
    pub fn is_active(&self) -> bool {
        self.is_playing
    }

    /// Flip between playing and paused. Returns the new state.
    pub fn toggle_play(&mut self) -> bool {
        self.is_playing = !self.is_playing;
        self.is_playing
    }

    /// Set the volume on the 0 - 100 scale. Out-of-range values leave the
    /// current volume untouched.
    pub fn set_volume(&mut self, volume: i64) -> Result<u8, PlayerError> {
        self.volume = check_volume(volume)?;
        Ok(self.volume)
    }

    pub fn mute(&mut self) {
        self.is_muted = true;
    }

    pub fn unmute(&mut self) {
        self.is_muted = false;
    }

    /// Volume in the media engine's 0.0 - 1.0 scale, silenced while muted.
    pub fn effective_volume(&self) -> f32 {
        if self.is_muted {
            0.0
        } else {
            self.volume as f32 / 100.0
        }
    }

    /// Replace the owned playlist, keeping the current song where possible
    /// (see [`Playlist::replace`]).
    pub fn swap_playlist(&mut self, new: Playlist, deletion: bool) -> Result<(), PlayerError> {
        if new.is_empty() {
            return Err(PlayerError::InvalidPlaylist);
        }
        let tracks = new.tracks().to_vec();
        self.playlist.replace(tracks, deletion)?;
        Ok(())
    }
}

impl From<&MusicPlayer> for bool {
    fn from(player: &MusicPlayer) -> bool {
        player.is_active()
    }
}

impl fmt::Display for MusicPlayer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "<MusicPlayer({} - {})>",
            self.playlist.current().unwrap_or("-"),
            if self.is_playing { "Playing" } else { "Paused" }
        )
    }
}

fn check_volume(volume: i64) -> Result<u8, PlayerError> {
    if !(0..=100).contains(&volume) {
        return Err(PlayerError::VolumeOutOfRange(volume));
    }
    Ok(volume as u8)
}

// ── Media engine boundary ───────────────────────────────────────────────────

/// Audio transport the player drives. Volume is on the 0.0 - 1.0 scale.
pub trait MediaEngine {
    fn load(&mut self, path: &Path) -> Result<(), PlayerError>;
    fn play(&mut self);
    fn pause(&mut self);
    fn seek(&mut self, position: Duration) -> Result<(), PlayerError>;
    fn elapsed(&self) -> Duration;
    fn set_volume(&mut self, volume: f32);
    /// True when the loaded song has played to its end.
    fn is_finished(&self) -> bool;
}

/// rodio-backed engine. Not serializable; created fresh per session.
pub struct RodioEngine {
    _stream: OutputStream,
    handle: OutputStreamHandle,
    sink: Sink,
    volume: f32,
}

impl RodioEngine {
    /// Open the default audio output.
    pub fn new() -> Result<Self, PlayerError> {
        let (stream, handle) = OutputStream::try_default()
            .map_err(|e| PlayerError::Engine(format!("Failed to open audio output: {}", e)))?;
        let sink = Sink::try_new(&handle)
            .map_err(|e| PlayerError::Engine(format!("Failed to create audio sink: {}", e)))?;
        Ok(RodioEngine {
            _stream: stream,
            handle,
            sink,
            volume: 1.0,
        })
    }
}

impl MediaEngine for RodioEngine {
    /// Replace whatever is queued with `path`, paused at the start.
    fn load(&mut self, path: &Path) -> Result<(), PlayerError> {
        let file = File::open(path).map_err(|e| {
            PlayerError::Engine(format!("Cannot open '{}': {}", path.display(), e))
        })?;
        let source = Decoder::new(BufReader::new(file)).map_err(|e| {
            PlayerError::Engine(format!("Cannot decode '{}': {}", path.display(), e))
        })?;
        self.sink.stop();
        self.sink = Sink::try_new(&self.handle)
            .map_err(|e| PlayerError::Engine(format!("Failed to create audio sink: {}", e)))?;
        self.sink.pause();
        self.sink.set_volume(self.volume);
        self.sink.append(source);
        Ok(())
    }

    fn play(&mut self) {
        self.sink.play();
    }

    fn pause(&mut self) {
        self.sink.pause();
    }

    fn seek(&mut self, position: Duration) -> Result<(), PlayerError> {
        self.sink
            .try_seek(position)
            .map_err(|e| PlayerError::Engine(format!("Seek failed: {}", e)))
    }

    fn elapsed(&self) -> Duration {
        self.sink.get_pos()
    }

    fn set_volume(&mut self, volume: f32) {
        self.volume = volume.clamp(0.0, 1.0);
        self.sink.set_volume(self.volume);
    }

    fn is_finished(&self) -> bool {
        self.sink.empty()
    }
}
