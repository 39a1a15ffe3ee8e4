//! AppCore: central command dispatcher.
//!
//! Owns the settings store, the player (and through it the playlist), the
//! activity log and the lyrics of the current song. The CLI and the
//! integration tests drive the player exclusively through these methods;
//! nothing here touches a widget toolkit.

use crate::config::{self, ConfigStore, Language, LastSong, Settings};
use crate::error::{Error, LibraryError, Result};
use crate::library::{self, Order};
use crate::logbook::ActivityLog;
use crate::lyric_creator::LyricsCreator;
use crate::lyrics::{self, LyricsIndex};
use crate::player::{MediaEngine, MusicPlayer};
use crate::playlist::Playlist;
use crate::track;
use crate::trim::{self, FfmpegTrimmer, TrimRequest, Trimmer};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Seconds the saved position steps back so the user hears a little context
/// on resume.
const RESUME_STEP_BACK_SECS: f64 = 2.0;

// ── Paths ───────────────────────────────────────────────────────────────────

/// On-disk layout of the player's data.
#[derive(Debug, Clone)]
pub struct AppPaths {
    pub root: PathBuf,
    pub songs_dir: PathBuf,
    pub lyrics_dir: PathBuf,
    pub config_file: PathBuf,
    pub log_file: PathBuf,
}

impl AppPaths {
    pub fn under(root: &Path) -> Self {
        AppPaths {
            root: root.to_path_buf(),
            songs_dir: root.join("songs"),
            lyrics_dir: root.join("lyrics"),
            config_file: root.join("config.json"),
            log_file: root.join("logs").join("player.log"),
        }
    }

    /// `<data dir>/awesome_sound`, or the working directory when the platform
    /// has no data dir.
    pub fn default_root() -> PathBuf {
        dirs::data_dir()
            .map(|d| d.join("awesome_sound"))
            .unwrap_or_else(|| PathBuf::from("."))
    }

    fn ensure_dirs(&self) -> std::io::Result<()> {
        fs::create_dir_all(&self.songs_dir)?;
        fs::create_dir_all(&self.lyrics_dir)?;
        Ok(())
    }
}

// ── Response data types ─────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
pub struct StatusData {
    pub song: Option<String>,
    pub song_index: usize,
    pub song_count: usize,
    pub is_playing: bool,
    pub is_muted: bool,
    pub volume: u8,
    pub lyrics_delay_secs: f64,
    pub lyrics_file: Option<String>,
    pub lyric_lines: usize,
    pub language: Language,
    pub max_frame_rate: u32,
    pub download_dir: String,
}

/// Result of one timer tick.
#[derive(Debug, Clone, PartialEq)]
pub struct TickData {
    pub elapsed: Duration,
    pub line: Option<String>,
    pub song_changed: bool,
}

// ── AppCore ─────────────────────────────────────────────────────────────────

pub struct AppCore {
    pub paths: AppPaths,
    pub config: ConfigStore,
    pub player: MusicPlayer,
    pub logs: ActivityLog,
    lyrics: LyricsIndex,
    trimmer: Box<dyn Trimmer>,
}

impl AppCore {
    /// Open (or create) the player data under `paths` and resume the last
    /// song when it is still in the library.
    pub fn open(paths: AppPaths) -> Result<Self> {
        let logs = ActivityLog::new(&paths.log_file);
        Self::build(paths, logs)
    }

    /// Like [`AppCore::open`] but with a memory-only activity log. For tests.
    pub fn open_test(root: &Path) -> Result<Self> {
        Self::build(AppPaths::under(root), ActivityLog::in_memory())
    }

    /// Open the settings store, resetting values it cannot use to defaults.
    fn open_config(paths: &AppPaths, logs: &mut ActivityLog) -> Result<(ConfigStore, Settings)> {
        let config = ConfigStore::new(&paths.config_file, &Settings::default());
        if let Err(e) = config.init() {
            logs.warning(format!("Settings file unreadable ({}), restoring defaults", e));
            config.restore_default()?;
        }
        let settings = match config.settings() {
            Ok(settings) => settings,
            Err(e) => {
                let reset = config.repair()?;
                logs.warning(format!(
                    "Invalid settings ({}), reset to defaults: {}",
                    e,
                    reset.join(", ")
                ));
                config.settings()?
            }
        };
        Ok((config, settings))
    }

    fn build(paths: AppPaths, mut logs: ActivityLog) -> Result<Self> {
        paths.ensure_dirs()?;
        let (config, settings) = Self::open_config(&paths, &mut logs)?;
        let songs = library::list_songs(&paths.songs_dir)?;

        let resume = match &settings.last_song {
            Some(last) if songs.contains(&last.song) => Some(last.song.clone()),
            Some(last) => {
                logs.warning(format!("Last song '{}' is gone, starting over", last.song));
                config.set_last_song(None)?;
                None
            }
            None => None,
        };
        let playlist = Playlist::new(songs, resume.as_deref())?;
        let player = MusicPlayer::new(playlist, settings.is_muted, settings.volume as i64)?;

        let mut core = AppCore {
            paths,
            config,
            player,
            logs,
            lyrics: LyricsIndex::empty(),
            trimmer: Box::new(FfmpegTrimmer),
        };
        core.reload_lyrics();
        core.logs.info(format!(
            "Player opened with {} song(s)",
            core.player.playlist().len()
        ));
        Ok(core)
    }

    /// Replace the trim backend.
    pub fn with_trimmer(mut self, trimmer: Box<dyn Trimmer>) -> Self {
        self.trimmer = trimmer;
        self
    }

    pub fn settings(&self) -> Result<Settings> {
        Ok(self.config.settings()?)
    }

    // ── Current song ────────────────────────────────────────────────────

    fn current_song(&self) -> Result<String> {
        self.player
            .playlist()
            .current()
            .map(str::to_string)
            .ok_or_else(|| Error::NoSongs(self.paths.songs_dir.clone()))
    }

    fn current_song_name(&self) -> Result<String> {
        Ok(track::song_name(&self.current_song()?).to_string())
    }

    pub fn current_song_path(&self) -> Option<PathBuf> {
        self.player
            .playlist()
            .current()
            .map(|s| self.paths.songs_dir.join(s))
    }

    fn delay_key_for(&self, song: &str) -> String {
        config::delay_key(&self.paths.songs_dir.join(song))
    }

    fn current_delay_key(&self) -> Option<String> {
        self.player
            .playlist()
            .current()
            .map(|s| self.delay_key_for(s))
    }

    // ── Lyrics ──────────────────────────────────────────────────────────

    pub fn lyrics(&self) -> &LyricsIndex {
        &self.lyrics
    }

    pub fn find_lyrics_file(&self) -> Option<PathBuf> {
        let name = self.player.playlist().song_name()?;
        lyrics::find_lyrics_file(&self.paths.lyrics_dir, name)
    }

    /// Reload the current song's lyrics. A missing or malformed document
    /// leaves the song without lyrics.
    pub fn reload_lyrics(&mut self) {
        self.lyrics = match self.find_lyrics_file() {
            Some(path) => match LyricsIndex::open(&path) {
                Ok(index) => index,
                Err(e) => {
                    self.logs
                        .warning(format!("Ignoring lyrics '{}': {}", path.display(), e));
                    LyricsIndex::empty()
                }
            },
            None => LyricsIndex::empty(),
        };
    }

    /// Lyric delay of the current song in seconds.
    pub fn current_delay(&self) -> f64 {
        self.current_delay_key()
            .and_then(|k| self.config.delay(&k))
            .unwrap_or(0.0)
    }

    /// Line to display `elapsed` into the current song.
    pub fn lyric_at(&self, elapsed: Duration) -> Option<&str> {
        self.lyrics.get_line(elapsed, self.current_delay())
    }

    /// Store a lyric delay typed by the user. Input that is not a finite
    /// number is ignored and the previous delay kept; returns the stored
    /// value otherwise.
    pub fn set_lyrics_delay(&mut self, input: &str) -> Result<Option<f64>> {
        let secs = match input.trim().parse::<f64>() {
            Ok(secs) if secs.is_finite() => secs,
            _ => {
                tracing::debug!(input, "ignoring non-numeric lyrics delay");
                return Ok(None);
            }
        };
        let Some(key) = self.current_delay_key() else {
            return Ok(None);
        };
        self.config.set_delay(&key, secs)?;
        self.logs.info(format!("Lyrics delay set to {}s", secs));
        Ok(Some(secs))
    }

    /// Append a lyric line to the current song's document.
    pub fn write_lyric_line(&mut self, text: &str, start: Duration, stop: Duration) -> Result<usize> {
        let creator = LyricsCreator::new(&self.current_song_name()?, &self.paths.lyrics_dir);
        let index = creator.write_line(text, start, stop)?;
        self.reload_lyrics();
        Ok(index)
    }

    /// Adopt an external SRT file as the current song's lyrics.
    pub fn import_lyrics(&mut self, src: &Path) -> Result<PathBuf> {
        let ext_ok = src
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| library::SUPPORTED_LYRICS_FORMATS.contains(&e.to_ascii_lowercase().as_str()))
            .unwrap_or(false);
        if !ext_ok {
            return Err(LibraryError::Unsupported(src.display().to_string()).into());
        }
        // Refuse documents the renderer could not display.
        LyricsIndex::open(src)?;

        let name = self.current_song_name()?;
        let dest = LyricsCreator::new(&name, &self.paths.lyrics_dir).manual_save(src)?;
        self.logs.success(format!("Lyrics for {} have been set", name));
        self.reload_lyrics();
        Ok(dest)
    }

    /// Remove the current song's lyrics and delay. Returns false when there
    /// were no lyrics.
    pub fn delete_lyrics(&mut self) -> Result<bool> {
        let name = self.current_song_name()?;
        let Some(path) = self.find_lyrics_file() else {
            self.logs.info(format!("No lyrics found for {}", name));
            return Ok(false);
        };
        fs::remove_file(path)?;
        if let Some(key) = self.current_delay_key() {
            if self.config.remove_delay(&key)? {
                self.logs.info(format!("Lyrics delay for {} removed", name));
            }
        }
        self.logs.success(format!("Lyrics for {} were removed", name));
        self.reload_lyrics();
        Ok(true)
    }

    // ── Navigation & transport ──────────────────────────────────────────

    fn on_song_changed(&mut self) -> Result<String> {
        self.reload_lyrics();
        let song = self.current_song()?;
        tracing::info!(song = %song, index = self.player.playlist().current_index(), "song changed");
        Ok(song)
    }

    pub fn next_song(&mut self) -> Result<String> {
        self.player.playlist_mut().next();
        self.on_song_changed()
    }

    pub fn prev_song(&mut self) -> Result<String> {
        self.player.playlist_mut().prev();
        self.on_song_changed()
    }

    /// Jump to the song at `index` (0-based, `-1` meaning "no selection").
    pub fn pick_song(&mut self, index: isize) -> Result<String> {
        self.player.playlist_mut().user_pick(index)?;
        self.on_song_changed()
    }

    pub fn toggle_play(&mut self) -> bool {
        let playing = self.player.toggle_play();
        self.logs
            .info(if playing { "Playback resumed" } else { "Playback paused" });
        playing
    }

    /// Set and persist the volume.
    pub fn set_volume(&mut self, volume: i64) -> Result<u8> {
        let v = self.player.set_volume(volume)?;
        self.config.set_volume(v)?;
        Ok(v)
    }

    /// Flip and persist the mute flag. Returns the new state.
    pub fn toggle_mute(&mut self) -> Result<bool> {
        if self.player.is_muted() {
            self.player.unmute();
        } else {
            self.player.mute();
        }
        let muted = self.player.is_muted();
        self.config.set_muted(muted)?;
        self.logs.info(if muted { "Muted" } else { "Unmuted" });
        Ok(muted)
    }

    // ── Media engine ────────────────────────────────────────────────────

    /// Load the current song into `engine` and match its transport and
    /// volume to the player state.
    pub fn load_into(&self, engine: &mut dyn MediaEngine) -> Result<()> {
        let path = self
            .current_song_path()
            .ok_or_else(|| Error::NoSongs(self.paths.songs_dir.clone()))?;
        engine.load(&path)?;
        self.sync_engine(engine);
        Ok(())
    }

    pub fn sync_engine(&self, engine: &mut dyn MediaEngine) {
        engine.set_volume(self.player.effective_volume());
        if self.player.is_active() {
            engine.play();
        } else {
            engine.pause();
        }
    }

    /// One timer tick: advance past finished songs, keep the engine volume
    /// current, and look up the lyric line for the elapsed time.
    pub fn tick(&mut self, engine: &mut dyn MediaEngine) -> Result<TickData> {
        let mut song_changed = false;
        if self.player.is_active() && engine.is_finished() {
            self.next_song()?;
            self.load_into(engine)?;
            song_changed = true;
        }
        engine.set_volume(self.player.effective_volume());
        let elapsed = engine.elapsed();
        Ok(TickData {
            elapsed,
            line: self.lyric_at(elapsed).map(str::to_string),
            song_changed,
        })
    }

    /// Interval between ticks for the configured frame rate.
    pub fn tick_interval(&self) -> Result<Duration> {
        let frames = self.settings()?.max_frame_rate.max(1);
        Ok(Duration::from_millis(1000 / frames as u64))
    }

    /// Seek `secs` forward (or backward when negative) from the current
    /// position, stopping at the start of the song. Returns the new position.
    pub fn step(&mut self, engine: &mut dyn MediaEngine, secs: f64) -> Result<Duration> {
        let from = engine.elapsed();
        let target = (from.as_secs_f64() + secs).max(0.0);
        let Ok(to) = Duration::try_from_secs_f64(target) else {
            return Ok(from);
        };
        engine.seek(to)?;
        tracing::debug!(?from, ?to, "seek step");
        Ok(to)
    }

    // ── Session ─────────────────────────────────────────────────────────

    /// Remember the current song and position for the next start.
    pub fn save_session(&mut self, elapsed: Duration) -> Result<()> {
        let Some(song) = self.player.playlist().current().map(str::to_string) else {
            return Ok(());
        };
        let secs = (elapsed.as_secs_f64() - RESUME_STEP_BACK_SECS).max(0.0);
        let timestamp = (secs * 100.0).round() / 100.0;
        self.config
            .set_last_song(Some(&LastSong { song, timestamp }))?;
        self.logs.info("Session saved");
        Ok(())
    }

    /// Saved position of the current song, if the session ended on it.
    pub fn resume_position(&self) -> Result<Option<Duration>> {
        let current = self.player.playlist().current();
        Ok(self
            .settings()?
            .last_song
            .filter(|last| Some(last.song.as_str()) == current)
            .and_then(|last| Duration::try_from_secs_f64(last.timestamp).ok()))
    }

    // ── Library ─────────────────────────────────────────────────────────

    /// Rebuild the playlist from `songs`. The saved session is dropped since
    /// positions in the old list no longer apply.
    fn update_song_list(&mut self, songs: Vec<String>, deletion: bool) -> Result<()> {
        self.config.set_last_song(None)?;
        if self.player.playlist().is_empty() {
            *self.player.playlist_mut() = Playlist::new(songs, None)?;
        } else {
            self.player
                .swap_playlist(Playlist::new(songs, None)?, deletion)?;
        }
        self.reload_lyrics();
        Ok(())
    }

    pub fn import_songs(&mut self, paths: &[PathBuf]) -> Result<Vec<String>> {
        let imported = library::import_songs(paths, &self.paths.songs_dir)?;
        // New files go after the current order.
        let mut songs = self.player.playlist().tracks().to_vec();
        for song in library::list_songs(&self.paths.songs_dir)? {
            if !songs.contains(&song) {
                songs.push(song);
            }
        }
        self.update_song_list(songs, false)?;
        self.logs
            .success(format!("Imported {} song(s)", imported.len()));
        Ok(imported)
    }

    /// Delete the current song from disk; playback moves to the song after it.
    pub fn delete_song(&mut self) -> Result<String> {
        if self.player.playlist().len() < 2 {
            return Err(LibraryError::TooFewSongs.into());
        }
        let song = self.current_song()?;
        let key = self.delay_key_for(&song);
        library::delete_song(&self.paths.songs_dir, &song)?;
        let songs: Vec<String> = self
            .player
            .playlist()
            .iter()
            .filter(|s| *s != song)
            .map(str::to_string)
            .collect();
        self.update_song_list(songs, true)?;
        if self.config.remove_delay(&key)? {
            self.logs
                .info(format!("Lyrics delay for {} removed", track::song_name(&song)));
        }
        self.logs
            .success(format!("`{}` was deleted", track::song_name(&song)));
        Ok(song)
    }

    /// Rename the current song (extension kept), carrying its lyrics and delay.
    pub fn rename_song(&mut self, new_stem: &str) -> Result<String> {
        let song = self.current_song()?;
        let (old_stem, ext) = library::split_name(&song);
        let old_stem = old_stem.to_string();
        let new_stem = new_stem.trim();
        if new_stem.is_empty() || new_stem == old_stem {
            return Ok(song);
        }

        let new_name = library::rename_song(&self.paths.songs_dir, &old_stem, new_stem, ext)?;

        let old_lyrics = lyrics::lyrics_path(&self.paths.lyrics_dir, &old_stem);
        if old_lyrics.is_file() {
            fs::rename(
                &old_lyrics,
                lyrics::lyrics_path(&self.paths.lyrics_dir, new_stem),
            )?;
        }
        self.config
            .rename_delay(&self.delay_key_for(&song), &self.delay_key_for(&new_name))?;

        self.config.set_last_song(None)?;
        let songs: Vec<String> = self
            .player
            .playlist()
            .iter()
            .map(|s| if s == song { new_name.clone() } else { s.to_string() })
            .collect();
        *self.player.playlist_mut() = Playlist::new(songs, Some(&new_name))?;
        self.reload_lyrics();
        self.logs
            .info(format!("Renamed {} -> {}", old_stem, new_stem));
        Ok(new_name)
    }

    /// Copy the current song into the download directory.
    pub fn export_song(&mut self) -> Result<PathBuf> {
        let song = self.current_song()?;
        let dest = PathBuf::from(self.settings()?.download_dir);
        let out = library::export_song(&self.paths.songs_dir, &song, &dest)?;
        self.logs
            .info(format!("Exported {} -> {}", song, dest.display()));
        Ok(out)
    }

    pub fn order_by(&mut self, order: Order) -> Result<()> {
        let songs = library::list_songs(&self.paths.songs_dir)?;
        let ordered = library::order_songs(songs, &self.paths.songs_dir, order);
        self.update_song_list(ordered, false)?;
        self.logs.info(format!("Playlist ordered: {:?}", order));
        Ok(())
    }

    /// Cut `[start, stop)` of the current song into
    /// `<download dir>/<name>-trimmed<ext>` and add it to the library.
    pub fn trim(&mut self, start: Duration, stop: Duration) -> Result<String> {
        let request = match TrimRequest::new(start, stop) {
            Ok(r) => r,
            Err(e) => {
                self.logs.warning("Trim aborted");
                return Err(e.into());
            }
        };
        let song = self.current_song()?;
        let input = self.paths.songs_dir.join(&song);
        let download_dir = PathBuf::from(self.settings()?.download_dir);
        fs::create_dir_all(&download_dir)?;
        let output = download_dir.join(trim::trimmed_name(&song));

        self.trimmer.trim(&input, &output, &request)?;
        let imported = self.import_songs(&[output])?;
        let name = imported
            .into_iter()
            .next()
            .ok_or_else(|| LibraryError::Unsupported(trim::trimmed_name(&song)))?;
        self.logs.success(format!(
            "Trimmed {:.3} - {:.3}",
            request.start.as_secs_f64(),
            request.stop.as_secs_f64()
        ));
        Ok(name)
    }

    // ── Settings ────────────────────────────────────────────────────────

    pub fn set_language(&mut self, language: Language) -> Result<()> {
        self.config.set_language(language)?;
        self.logs
            .success(format!("Language changed to {}", language.code()));
        Ok(())
    }

    pub fn set_max_frame_rate(&mut self, frames: u32) -> Result<()> {
        if let Err(e) = self.config.set_max_frame_rate(frames) {
            self.logs
                .warning(format!("Invalid frame rate {}", frames));
            return Err(e.into());
        }
        self.logs.success(format!("Max frame rate set to {}", frames));
        Ok(())
    }

    pub fn set_download_dir(&mut self, dir: &Path) -> Result<()> {
        let prev = self.settings()?.download_dir;
        fs::create_dir_all(dir)?;
        self.config.set_download_dir(dir)?;
        self.logs
            .info(format!("Download dir changed {} -> {}", prev, dir.display()));
        Ok(())
    }

    /// Reset every setting (delays included) and re-apply volume and mute.
    pub fn restore_settings(&mut self) -> Result<()> {
        self.config.restore_default()?;
        let settings = self.settings()?;
        self.player.set_volume(settings.volume as i64)?;
        if settings.is_muted {
            self.player.mute();
        } else {
            self.player.unmute();
        }
        self.logs.info("Settings restored");
        Ok(())
    }

    pub fn clear_logs(&mut self) -> Result<()> {
        self.logs.clear()?;
        Ok(())
    }

    // ── Status ──────────────────────────────────────────────────────────

    pub fn status(&self) -> Result<StatusData> {
        let settings = self.settings()?;
        let pl = self.player.playlist();
        Ok(StatusData {
            song: pl.current().map(str::to_string),
            song_index: pl.current_index(),
            song_count: pl.len(),
            is_playing: self.player.is_playing(),
            is_muted: self.player.is_muted(),
            volume: self.player.volume(),
            lyrics_delay_secs: self.current_delay(),
            lyrics_file: self.find_lyrics_file().map(|p| p.display().to_string()),
            lyric_lines: self.lyrics.len(),
            language: settings.language,
            max_frame_rate: settings.max_frame_rate,
            download_dir: settings.download_dir,
        })
    }
}
