//! Timed lyrics: SRT parsing and the playback-time line lookup.

use crate::error::LyricsError;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const EXTENSION: &str = "srt";

/// One subtitle entry, active on `[start, end)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LyricLine {
    pub start: Duration,
    pub end: Duration,
    pub text: String,
}

impl LyricLine {
    pub fn contains(&self, at: Duration) -> bool {
        self.start <= at && at < self.end
    }
}

/// Parsed lyrics of one song, immutable once loaded.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LyricsIndex {
    lines: Vec<LyricLine>,
    /// Lines are ascending and non-overlapping, so binary search is exact.
    ordered: bool,
}

impl LyricsIndex {
    pub fn empty() -> Self {
        LyricsIndex {
            lines: Vec::new(),
            ordered: true,
        }
    }

    /// Load lyrics from a file, or parse `source` as document text when no
    /// such file exists.
    pub fn load(source: &str) -> Result<Self, LyricsError> {
        let path = Path::new(source);
        if path.is_file() {
            Self::open(path)
        } else {
            Self::parse(source)
        }
    }

    pub fn open(path: &Path) -> Result<Self, LyricsError> {
        let text = fs::read_to_string(path)?;
        Self::parse(&text)
    }

    pub fn parse(text: &str) -> Result<Self, LyricsError> {
        let lines = parse_srt(text)?;
        let ordered = lines.iter().all(|l| l.start <= l.end)
            && lines
                .windows(2)
                .all(|w| w[0].start <= w[1].start && w[0].end <= w[1].start);
        Ok(LyricsIndex { lines, ordered })
    }

    pub fn lines(&self) -> &[LyricLine] {
        &self.lines
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Text active at `timestamp` once shifted back by `delay_secs`.
    ///
    /// A positive delay makes lyrics show up later, a negative one earlier.
    /// Start is inclusive and end exclusive.
    pub fn get_line(&self, timestamp: Duration, delay_secs: f64) -> Option<&str> {
        let adjusted = apply_delay(timestamp, delay_secs)?;
        if self.ordered {
            self.search(adjusted)
        } else {
            self.scan(adjusted)
        }
    }

    fn search(&self, at: Duration) -> Option<&str> {
        let i = self.lines.partition_point(|l| l.start <= at);
        let line = self.lines.get(i.checked_sub(1)?)?;
        line.contains(at).then_some(line.text.as_str())
    }

    fn scan(&self, at: Duration) -> Option<&str> {
        self.lines
            .iter()
            .find(|l| l.contains(at))
            .map(|l| l.text.as_str())
    }
}

/// `timestamp - delay`, or `None` when that falls before zero. Delays
/// resolve to whole milliseconds, the precision of the documents.
fn apply_delay(timestamp: Duration, delay_secs: f64) -> Option<Duration> {
    if !delay_secs.is_finite() {
        return Some(timestamp);
    }
    let shift = Duration::from_millis((delay_secs.abs() * 1000.0).round() as u64);
    if delay_secs >= 0.0 {
        timestamp.checked_sub(shift)
    } else {
        timestamp.checked_add(shift)
    }
}

/// Lyrics document for `song_name` in `lyrics_dir`, if one exists.
pub fn find_lyrics_file(lyrics_dir: &Path, song_name: &str) -> Option<PathBuf> {
    let path = lyrics_path(lyrics_dir, song_name);
    path.is_file().then_some(path)
}

pub fn lyrics_path(lyrics_dir: &Path, song_name: &str) -> PathBuf {
    lyrics_dir.join(format!("{}.{}", song_name, EXTENSION))
}

// ── SRT ─────────────────────────────────────────────────────────────────────

fn parse_srt(text: &str) -> Result<Vec<LyricLine>, LyricsError> {
    let mut lines = Vec::new();
    let mut block: Vec<(usize, &str)> = Vec::new();

    for (n, raw) in text.lines().enumerate() {
        let line = raw.trim_end_matches('\r');
        if line.trim().is_empty() {
            if !block.is_empty() {
                lines.push(parse_block(&block)?);
                block.clear();
            }
        } else {
            block.push((n + 1, line));
        }
    }
    if !block.is_empty() {
        lines.push(parse_block(&block)?);
    }
    Ok(lines)
}

fn parse_block(block: &[(usize, &str)]) -> Result<LyricLine, LyricsError> {
    let mut rest = block;
    let (first_no, first) = rest[0];

    // The numeric counter is optional; some editors drop it.
    if !first.contains("-->") {
        if first.trim().parse::<u64>().is_err() {
            return Err(LyricsError::Parse {
                line: first_no,
                reason: format!("expected an entry number, found '{}'", first.trim()),
            });
        }
        rest = &rest[1..];
    }

    let Some(&(time_no, time_line)) = rest.first() else {
        return Err(LyricsError::Parse {
            line: first_no,
            reason: "entry has no time range".into(),
        });
    };
    let (start, end) = parse_time_range(time_line).map_err(|reason| LyricsError::Parse {
        line: time_no,
        reason,
    })?;

    let text = rest[1..]
        .iter()
        .map(|(_, l)| *l)
        .collect::<Vec<_>>()
        .join("\n");

    Ok(LyricLine { start, end, text })
}

fn parse_time_range(line: &str) -> Result<(Duration, Duration), String> {
    let (left, right) = line
        .split_once("-->")
        .ok_or_else(|| format!("expected 'start --> end', found '{}'", line.trim()))?;
    let start = parse_timestamp(left.trim())?;
    // Anything after the end stamp is positioning data.
    let end_token = right.split_whitespace().next().unwrap_or("");
    let end = parse_timestamp(end_token)?;
    Ok((start, end))
}

/// Parse `HH:MM:SS,mmm` (a `.` millisecond separator is accepted too).
pub fn parse_timestamp(stamp: &str) -> Result<Duration, String> {
    let bad = || format!("invalid timestamp '{}'", stamp);

    let mut parts = stamp.split(':');
    let (Some(h), Some(m), Some(s), None) = (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return Err(bad());
    };
    let (secs, millis) = match s.split_once([',', '.']) {
        Some((secs, millis)) => (secs, millis),
        None => (s, "0"),
    };
    if millis.is_empty() || millis.len() > 3 || !millis.bytes().all(|b| b.is_ascii_digit()) {
        return Err(bad());
    }

    let h: u64 = h.parse().map_err(|_| bad())?;
    let m: u64 = m.parse().map_err(|_| bad())?;
    let secs: u64 = secs.parse().map_err(|_| bad())?;
    // "5" means 500 ms, not 5 ms.
    let millis: u64 = format!("{:0<3}", millis).parse().map_err(|_| bad())?;
    if m >= 60 || secs >= 60 {
        return Err(bad());
    }

    let total = h
        .checked_mul(60)
        .and_then(|v| v.checked_add(m))
        .and_then(|v| v.checked_mul(60))
        .and_then(|v| v.checked_add(secs))
        .and_then(|v| v.checked_mul(1000))
        .and_then(|v| v.checked_add(millis))
        .ok_or_else(bad)?;
    Ok(Duration::from_millis(total))
}

/// Render a duration as an SRT timestamp, `HH:MM:SS,mmm`.
pub fn format_timestamp(at: Duration) -> String {
    let total_ms = at.as_millis();
    let ms = total_ms % 1000;
    let total_secs = total_ms / 1000;
    format!(
        "{:02}:{:02}:{:02},{:03}",
        total_secs / 3600,
        (total_secs / 60) % 60,
        total_secs % 60,
        ms
    )
}
