//! Authoring lyrics for the song that is playing.

use crate::error::LyricsError;
use crate::lyrics::{format_timestamp, lyrics_path};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Appends timed lines to `<lyrics_dir>/<song name>.srt`.
#[derive(Debug, Clone)]
pub struct LyricsCreator {
    song_name: String,
    path: PathBuf,
}

impl LyricsCreator {
    pub fn new(song_name: &str, lyrics_dir: &Path) -> Self {
        LyricsCreator {
            song_name: song_name.to_string(),
            path: lyrics_path(lyrics_dir, song_name),
        }
    }

    pub fn song_name(&self) -> &str {
        &self.song_name
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Create an empty document unless one already exists.
    pub fn init(&self) -> Result<(), LyricsError> {
        if let Some(dir) = self.path.parent() {
            fs::create_dir_all(dir)?;
        }
        OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        Ok(())
    }

    /// Number of entries already in the document.
    pub fn entry_count(&self) -> Result<usize, LyricsError> {
        let content = match fs::read_to_string(&self.path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(e.into()),
        };
        Ok(content.lines().filter(|l| l.contains("-->")).count())
    }

    /// Append one entry numbered after the existing ones. Entries are not
    /// re-sorted, so callers mark lines in playback order.
    pub fn write_line(&self, text: &str, start: Duration, stop: Duration) -> Result<usize, LyricsError> {
        if start >= stop {
            return Err(LyricsError::InvalidRange { start, stop });
        }
        self.init()?;
        let existing = fs::read_to_string(&self.path)?;
        let index = existing.lines().filter(|l| l.contains("-->")).count();

        let mut entry = String::new();
        if !existing.trim().is_empty() {
            if !existing.ends_with('\n') {
                entry.push('\n');
            }
            if !existing.ends_with("\n\n") {
                entry.push('\n');
            }
        }
        entry.push_str(&format!(
            "{}\n{} --> {}\n{}\n",
            index,
            format_timestamp(start),
            format_timestamp(stop),
            text
        ));

        let mut file = OpenOptions::new().append(true).open(&self.path)?;
        file.write_all(entry.as_bytes())?;
        tracing::debug!(song = %self.song_name, index, "lyric line written");
        Ok(index)
    }

    /// Copy an externally authored document into place for this song.
    pub fn manual_save(&self, src: &Path) -> Result<PathBuf, LyricsError> {
        let content = fs::read_to_string(src)?;
        if let Some(dir) = self.path.parent() {
            fs::create_dir_all(dir)?;
        }
        fs::write(&self.path, content)?;
        Ok(self.path.clone())
    }
}
