use lofty::file::{AudioFile, TaggedFileExt};
use lofty::tag::Accessor;
use std::path::Path;
use std::time::Duration;

/// Display name of a track file: everything before the rightmost `.`.
///
/// `"Sjaak - Trompetisto (Official Music Video).mp3"` becomes
/// `"Sjaak - Trompetisto (Official Music Video)"`. Names without a dot are
/// returned unchanged.
pub fn song_name(file_name: &str) -> &str {
    match file_name.rfind('.') {
        Some(pos) => &file_name[..pos],
        None => file_name,
    }
}

/// Extension of a track file including the leading dot, or `""`.
pub fn extension(file_name: &str) -> &str {
    match file_name.rfind('.') {
        Some(pos) => &file_name[pos..],
        None => "",
    }
}

/// Total duration of an audio file as reported by its tags/properties.
pub fn duration_of(path: &Path) -> Result<Duration, String> {
    let tagged_file = lofty::read_from_path(path)
        .map_err(|e| format!("Failed to read '{}': {}", path.display(), e))?;
    Ok(tagged_file.properties().duration())
}

/// Format a duration as `M:SS`.
pub fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs();
    format!("{}:{:02}", secs / 60, secs % 60)
}

/// Tag-derived details of one song on disk, used for listings and ordering.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackInfo {
    pub title: String,
    pub artist: Option<String>,
    pub duration: Duration,
}

impl TrackInfo {
    /// Read metadata for `file_name` inside `songs_dir`. The title falls back
    /// to the song name when the file carries no tag.
    pub fn from_path(songs_dir: &Path, file_name: &str) -> Result<Self, String> {
        let path = songs_dir.join(file_name);
        let tagged_file = lofty::read_from_path(&path)
            .map_err(|e| format!("Failed to read '{}': {}", path.display(), e))?;

        let duration = tagged_file.properties().duration();
        let tag = tagged_file.primary_tag().or_else(|| tagged_file.first_tag());

        let title = tag
            .and_then(|t| t.title().map(|s| s.to_string()))
            .unwrap_or_else(|| song_name(file_name).to_string());
        let artist = tag.and_then(|t| t.artist().map(|s| s.to_string()));

        Ok(TrackInfo {
            title,
            artist,
            duration,
        })
    }

    /// `Artist - Title`, or just the title when the artist is unknown.
    pub fn label(&self) -> String {
        match &self.artist {
            Some(artist) => format!("{} - {}", artist, self.title),
            None => self.title.clone(),
        }
    }

    pub fn duration_display(&self) -> String {
        format_duration(self.duration)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn song_name_strips_rightmost_extension() {
        assert_eq!(
            song_name("Sjaak - Trompetisto (Official Music Video).mp3"),
            "Sjaak - Trompetisto (Official Music Video)"
        );
        assert_eq!(song_name("a.b.c.mp3"), "a.b.c");
        assert_eq!(song_name("noext"), "noext");
    }

    #[test]
    fn extension_keeps_leading_dot() {
        assert_eq!(extension("song.flac"), ".flac");
        assert_eq!(extension("song"), "");
    }

    #[test]
    fn format_duration_pads_seconds() {
        assert_eq!(format_duration(Duration::new(185, 0)), "3:05");
        assert_eq!(format_duration(Duration::ZERO), "0:00");
    }

    #[test]
    fn duration_of_rejects_missing_file() {
        assert!(duration_of(Path::new("nonexistent.mp3")).is_err());
    }

    #[test]
    fn label_includes_artist_when_tagged() {
        let mut info = TrackInfo {
            title: "Babel".into(),
            artist: Some("Gustavo Santaolalla".into()),
            duration: Duration::from_millis(1500),
        };
        assert_eq!(info.label(), "Gustavo Santaolalla - Babel");
        assert_eq!(info.duration_display(), "0:01");
        info.artist = None;
        assert_eq!(info.label(), "Babel");
    }

    #[test]
    fn track_info_rejects_unreadable_file() {
        let dir = tempfile::TempDir::new().unwrap();
        std::fs::write(dir.path().join("fake.mp3"), b"not audio").unwrap();
        assert!(TrackInfo::from_path(dir.path(), "fake.mp3").is_err());
    }
}
