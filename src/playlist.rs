use crate::error::PlaylistError;
use crate::track;
use serde::{Deserialize, Serialize};

/// The "disk": an ordered list of song file names plus the cursor of the
/// song that is currently loaded.
///
/// The cursor always satisfies `index < tracks.len()` for a non-empty
/// playlist. The track list itself is never mutated in place; imports,
/// deletions and reorders go through [`Playlist::replace`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Playlist {
    tracks: Vec<String>,
    index: usize,
}

impl Playlist {
    /// Build a playlist, optionally resuming at `resume`.
    pub fn new(tracks: Vec<String>, resume: Option<&str>) -> Result<Self, PlaylistError> {
        let index = match resume {
            Some(name) => tracks
                .iter()
                .position(|t| t == name)
                .ok_or_else(|| PlaylistError::ResumeNotFound(name.to_string()))?,
            None => 0,
        };
        Ok(Playlist { tracks, index })
    }

    /// The song under the cursor.
    pub fn current(&self) -> Option<&str> {
        self.tracks.get(self.index).map(String::as_str)
    }

    pub fn current_index(&self) -> usize {
        self.index
    }

    /// Display name of the current song (file name without extension).
    pub fn song_name(&self) -> Option<&str> {
        self.current().map(track::song_name)
    }

    /// Advance one song, wrapping from the last song to the first.
    pub fn next(&mut self) -> Option<&str> {
        if self.tracks.is_empty() {
            return None;
        }
        self.index += 1;
        if self.index == self.tracks.len() {
            self.index = 0;
        }
        self.current()
    }

    /// Step back one song, wrapping from the first song to the last.
    pub fn prev(&mut self) -> Option<&str> {
        if self.tracks.is_empty() {
            return None;
        }
        self.index = match self.index.checked_sub(1) {
            Some(i) => i,
            None => self.tracks.len() - 1,
        };
        self.current()
    }

    /// Point the cursor at a song the user selected.
    ///
    /// Takes a signed index because list widgets report `-1` for "no row";
    /// both negative and past-the-end indices are rejected.
    pub fn user_pick(&mut self, index: isize) -> Result<&str, PlaylistError> {
        let len = self.tracks.len();
        if index < 0 || index as usize >= len {
            return Err(PlaylistError::IndexOutOfRange {
                index: index as i64,
                len,
            });
        }
        self.index = index as usize;
        Ok(&self.tracks[self.index])
    }

    /// Swap in a new track list, keeping the cursor on the same logical song.
    ///
    /// With `deletion == false` the current song must still exist in
    /// `new_tracks` and the cursor follows it. With `deletion == true` the
    /// current song is the one that was removed, so the cursor lands on the
    /// song that followed it (wrapping to the start when it was the last).
    pub fn replace(&mut self, new_tracks: Vec<String>, deletion: bool) -> Result<(), PlaylistError> {
        if deletion {
            self.index = if self.index < new_tracks.len() {
                self.index
            } else {
                0
            };
            self.tracks = new_tracks;
            return Ok(());
        }

        let index = match self.current() {
            Some(name) => new_tracks
                .iter()
                .position(|t| t == name)
                .ok_or_else(|| PlaylistError::TrackMissing(name.to_string()))?,
            None => 0,
        };
        self.tracks = new_tracks;
        self.index = index;
        Ok(())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tracks.iter().any(|t| t == name)
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&str> {
        self.tracks.get(index).map(String::as_str)
    }

    pub fn tracks(&self) -> &[String] {
        &self.tracks
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.tracks.iter().map(String::as_str)
    }
}

impl std::ops::Index<usize> for Playlist {
    type Output = str;

    fn index(&self, index: usize) -> &str {
        &self.tracks[index]
    }
}

impl<'a> IntoIterator for &'a Playlist {
    type Item = &'a String;
    type IntoIter = std::slice::Iter<'a, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.tracks.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn abc() -> Playlist {
        Playlist::new(vec!["a.mp3".into(), "b.mp3".into(), "c.mp3".into()], None).unwrap()
    }

    #[test]
    fn new_playlist_starts_at_zero() {
        let pl = abc();
        assert_eq!(pl.current_index(), 0);
        assert_eq!(pl.current(), Some("a.mp3"));
        assert_eq!(pl.song_name(), Some("a"));
    }

    #[test]
    fn resume_track_sets_cursor() {
        let pl = Playlist::new(vec!["a.mp3".into(), "b.mp3".into()], Some("b.mp3")).unwrap();
        assert_eq!(pl.current_index(), 1);
    }

    #[test]
    fn resume_track_must_be_member() {
        let err = Playlist::new(vec!["a.mp3".into()], Some("zzz.mp3")).unwrap_err();
        assert_eq!(err, PlaylistError::ResumeNotFound("zzz.mp3".into()));
    }

    #[test]
    fn next_wraps_after_last_track() {
        let mut pl = abc();
        assert_eq!(pl.next(), Some("b.mp3"));
        assert_eq!(pl.current_index(), 1);
        assert_eq!(pl.next(), Some("c.mp3"));
        assert_eq!(pl.current_index(), 2);
        assert_eq!(pl.next(), Some("a.mp3"));
        assert_eq!(pl.current_index(), 0);
    }

    #[test]
    fn prev_wraps_before_first_track() {
        let mut pl = abc();
        assert_eq!(pl.prev(), Some("c.mp3"));
        assert_eq!(pl.current_index(), 2);
    }

    #[test]
    fn navigation_on_empty_playlist_is_noop() {
        let mut pl = Playlist::new(Vec::new(), None).unwrap();
        assert_eq!(pl.next(), None);
        assert_eq!(pl.prev(), None);
        assert_eq!(pl.current(), None);
    }

    #[test]
    fn user_pick_rejects_negative_and_past_end() {
        let mut pl = abc();
        assert_eq!(pl.user_pick(2).unwrap(), "c.mp3");
        assert_eq!(pl.current_index(), 2);
        assert!(matches!(
            pl.user_pick(-1),
            Err(PlaylistError::IndexOutOfRange { index: -1, len: 3 })
        ));
        assert!(pl.user_pick(3).is_err());
        assert_eq!(pl.current_index(), 2);
    }

    #[test]
    fn replace_follows_current_track() {
        let mut pl = abc();
        pl.next();
        pl.replace(vec!["c.mp3".into(), "b.mp3".into(), "a.mp3".into()], false)
            .unwrap();
        assert_eq!(pl.current(), Some("b.mp3"));
        assert_eq!(pl.current_index(), 1);
    }

    #[test]
    fn replace_fails_when_current_track_vanished() {
        let mut pl = abc();
        let err = pl.replace(vec!["b.mp3".into()], false).unwrap_err();
        assert_eq!(err, PlaylistError::TrackMissing("a.mp3".into()));
        assert_eq!(pl.len(), 3);
    }

    #[test]
    fn replace_after_deletion_lands_on_following_track() {
        let mut pl = Playlist::new(vec!["a".into(), "b".into(), "c".into()], Some("b")).unwrap();
        pl.replace(vec!["a".into(), "c".into()], true).unwrap();
        assert_eq!(pl.current(), Some("c"));
    }

    #[test]
    fn replace_after_deleting_last_track_wraps() {
        let mut pl = Playlist::new(vec!["a".into(), "b".into(), "c".into()], Some("c")).unwrap();
        pl.replace(vec!["a".into(), "b".into()], true).unwrap();
        assert_eq!(pl.current(), Some("a"));
    }

    #[test]
    fn read_only_views() {
        let pl = abc();
        assert!(pl.contains("b.mp3"));
        assert!(!pl.contains("d.mp3"));
        assert_eq!(pl.len(), 3);
        assert_eq!(&pl[1], "b.mp3");
        assert_eq!(pl.get(5), None);
        let names: Vec<&str> = pl.iter().collect();
        assert_eq!(names, ["a.mp3", "b.mp3", "c.mp3"]);
        assert_eq!((&pl).into_iter().count(), 3);
    }

    fn playlist_of(len: usize, start: usize) -> Playlist {
        let tracks = (0..len).map(|i| format!("{i}.mp3")).collect();
        let mut pl = Playlist::new(tracks, None).unwrap();
        pl.user_pick(start as isize).unwrap();
        pl
    }

    proptest! {
        #[test]
        fn next_then_prev_is_identity((len, start) in (1usize..40).prop_flat_map(|n| (Just(n), 0..n))) {
            let mut pl = playlist_of(len, start);
            pl.next();
            pl.prev();
            prop_assert_eq!(pl.current_index(), start);
            pl.prev();
            pl.next();
            prop_assert_eq!(pl.current_index(), start);
        }

        #[test]
        fn full_cycle_returns_to_start(len in 1usize..40) {
            let mut pl = playlist_of(len, 0);
            for _ in 0..len {
                pl.next();
            }
            prop_assert_eq!(pl.current_index(), 0);
        }

        #[test]
        fn user_pick_sets_index((len, i) in (1usize..40).prop_flat_map(|n| (Just(n), 0..n))) {
            let mut pl = playlist_of(len, 0);
            pl.user_pick(i as isize).unwrap();
            prop_assert_eq!(pl.current_index(), i);
        }
    }
}
