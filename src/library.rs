//! The songs directory: listing, import, delete, rename, export, ordering.

use crate::error::LibraryError;
use crate::track;
use std::fs;
use std::path::{Path, PathBuf};

pub const SUPPORTED_SONG_FORMATS: &[&str] = &["mp3", "wav", "ogg", "flac"];
pub const SUPPORTED_LYRICS_FORMATS: &[&str] = &["srt"];

/// True if `path` has one of the playable extensions.
pub fn is_supported(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| SUPPORTED_SONG_FORMATS.contains(&e.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

/// Song file names in `dir`, in directory-listing order.
///
/// Hidden files (including `.gitignore`) and subdirectories are skipped.
pub fn list_songs(dir: &Path) -> Result<Vec<String>, LibraryError> {
    let mut songs = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().to_string();
        if name.starts_with('.') {
            continue;
        }
        songs.push(name);
    }
    Ok(songs)
}

/// Copy audio files into `dir`. Returns the names that were imported;
/// unsupported files are skipped with a warning.
pub fn import_songs(paths: &[PathBuf], dir: &Path) -> Result<Vec<String>, LibraryError> {
    fs::create_dir_all(dir)?;
    let mut imported = Vec::new();
    for path in paths {
        if !is_supported(path) {
            tracing::warn!(path = %path.display(), "skipping unsupported file");
            continue;
        }
        let Some(name) = path.file_name() else {
            continue;
        };
        let to = dir.join(name);
        // Already in place, e.g. a trim written straight into the library.
        if !same_file(path, &to) {
            fs::copy(path, &to)?;
        }
        imported.push(name.to_string_lossy().to_string());
    }
    Ok(imported)
}

pub fn delete_song(dir: &Path, name: &str) -> Result<(), LibraryError> {
    let path = dir.join(name);
    if !path.is_file() {
        return Err(LibraryError::NotFound(name.to_string()));
    }
    fs::remove_file(path)?;
    Ok(())
}

/// Rename `<old_stem><ext>` to `<new_stem><ext>` inside `dir`.
pub fn rename_song(dir: &Path, old_stem: &str, new_stem: &str, ext: &str) -> Result<String, LibraryError> {
    check_stem(new_stem)?;
    let old_name = format!("{}{}", old_stem, ext);
    let new_name = format!("{}{}", new_stem, ext);
    let from = dir.join(&old_name);
    let to = dir.join(&new_name);
    if !from.is_file() {
        return Err(LibraryError::NotFound(old_name));
    }
    if to.exists() {
        return Err(LibraryError::AlreadyExists(new_name));
    }
    fs::rename(from, to)?;
    Ok(new_name)
}

/// Copy a song out of the library into `dest_dir`.
pub fn export_song(dir: &Path, name: &str, dest_dir: &Path) -> Result<PathBuf, LibraryError> {
    let from = dir.join(name);
    if !from.is_file() {
        return Err(LibraryError::NotFound(name.to_string()));
    }
    fs::create_dir_all(dest_dir)?;
    let to = dest_dir.join(name);
    if same_file(&from, &to) {
        return Err(LibraryError::AlreadyExists(to.display().to_string()));
    }
    fs::copy(from, &to)?;
    Ok(to)
}

/// True when both paths resolve to the same existing file. `fs::copy` onto
/// itself truncates the file.
fn same_file(a: &Path, b: &Path) -> bool {
    match (fs::canonicalize(a), fs::canonicalize(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

/// A song stem must stay a plain, visible file name inside the library.
fn check_stem(stem: &str) -> Result<(), LibraryError> {
    let bad = stem.is_empty()
        || stem.starts_with('.')
        || stem.chars().any(|c| c == '/' || c == '\\' || std::path::is_separator(c));
    if bad {
        return Err(LibraryError::InvalidName(stem.to_string()));
    }
    Ok(())
}

/// Playlist orderings offered by the player.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Order {
    Shuffle,
    Alphabetical,
    Length { descending: bool },
    Original,
}

impl std::str::FromStr for Order {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "shuffle" => Ok(Order::Shuffle),
            "alphabetical" => Ok(Order::Alphabetical),
            "length" | "length-asc" => Ok(Order::Length { descending: false }),
            "length-desc" => Ok(Order::Length { descending: true }),
            "original" => Ok(Order::Original),
            other => Err(format!(
                "Unknown order '{}' (shuffle, alphabetical, length, length-desc, original)",
                other
            )),
        }
    }
}

/// Reorder `songs` (as listed from `dir`).
///
/// Songs whose duration cannot be read sort as zero length.
pub fn order_songs(mut songs: Vec<String>, dir: &Path, order: Order) -> Vec<String> {
    match order {
        Order::Shuffle => fastrand::shuffle(&mut songs),
        Order::Alphabetical => songs.sort_by_key(|s| s.to_lowercase()),
        Order::Length { descending } => {
            let mut keyed: Vec<(std::time::Duration, String)> = songs
                .into_iter()
                .map(|s| {
                    let d = track::duration_of(&dir.join(&s)).unwrap_or_default();
                    (d, s)
                })
                .collect();
            keyed.sort_by_key(|(d, _)| *d);
            if descending {
                keyed.reverse();
            }
            songs = keyed.into_iter().map(|(_, s)| s).collect();
        }
        Order::Original => {}
    }
    songs
}

/// Split a song file name into its display stem and extension.
pub fn split_name(name: &str) -> (&str, &str) {
    (track::song_name(name), track::extension(name))
}
