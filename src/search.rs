//! Web search links for the current song.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchSite {
    Youtube,
    Lyrics,
}

impl SearchSite {
    fn base_url(self) -> &'static str {
        match self {
            SearchSite::Youtube => "https://www.youtube.com/results?search_query=",
            SearchSite::Lyrics => "https://www.rentanadviser.com/subtitles/subtitles4songs.aspx?q=",
        }
    }

    fn separator(self) -> &'static str {
        match self {
            SearchSite::Youtube => "+",
            SearchSite::Lyrics => "%20",
        }
    }
}

impl std::str::FromStr for SearchSite {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "youtube" => Ok(SearchSite::Youtube),
            "lyrics" => Ok(SearchSite::Lyrics),
            other => Err(format!("Unknown search site '{}' (youtube, lyrics)", other)),
        }
    }
}

/// Song title with any parenthesised suffix such as "(Official Video)" removed.
pub fn search_terms(song_title: &str) -> &str {
    let cut = song_title.find('(').unwrap_or(song_title.len());
    song_title[..cut].trim()
}

pub fn search_url(site: SearchSite, song_title: &str) -> String {
    let query = search_terms(song_title)
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(site.separator());
    format!("{}{}", site.base_url(), query)
}
