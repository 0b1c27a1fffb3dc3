//!
//! src/musixmatch/models.rs
//!
//! Records unwrapped from the Musixmatch message envelope
//!

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct MxmArtist {
    pub artist_id: u64,
    pub artist_name: String,
    #[serde(default)]
    pub artist_country: Option<String>,
    #[serde(default)]
    pub artist_rating: Option<u32>,
    #[serde(default)]
    pub artist_twitter_url: Option<String>
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct MxmTrack {
    pub track_id: u64,
    pub track_name: String,
    #[serde(default)]
    pub track_rating: Option<u32>,
    #[serde(default)]
    pub commontrack_id: Option<u64>,
    #[serde(default)]
    pub has_lyrics: u8,
    #[serde(default)]
    pub has_subtitles: u8,
    #[serde(default)]
    pub artist_id: Option<u64>,
    #[serde(default)]
    pub artist_name: String,
    #[serde(default)]
    pub album_id: Option<u64>,
    #[serde(default)]
    pub album_name: Option<String>,
    #[serde(default)]
    pub track_share_url: Option<String>,
    #[serde(default)]
    pub explicit: u8,
    #[serde(default)]
    pub instrumental: u8
}

impl MxmTrack {
    pub fn has_lyrics(&self) -> bool { self.has_lyrics != 0 && self.instrumental == 0 }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct MxmLyrics {
    pub lyrics_id: u64,
    #[serde(default)]
    pub lyrics_body: String,
    #[serde(default)]
    pub lyrics_copyright: Option<String>,
    #[serde(default)]
    pub lyrics_language: Option<String>,
    #[serde(default)]
    pub explicit: u8
}

#[derive(Debug, Deserialize)]
pub(crate) struct ArtistEntry {
    pub artist: MxmArtist
}

#[derive(Debug, Deserialize)]
pub(crate) struct TrackEntry {
    pub track: MxmTrack
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct ArtistListBody {
    #[serde(default)]
    pub artist_list: Vec<ArtistEntry>
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct TrackListBody {
    #[serde(default)]
    pub track_list: Vec<TrackEntry>
}

#[derive(Debug, Deserialize)]
pub(crate) struct LyricsBody {
    pub lyrics: MxmLyrics
}
