//!
//! src/spotify/models.rs
//!
//! Typed records for the Spotify Web API. Simplified and full objects share
//! one struct where the full object only adds optional fields
//!

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::SpotifyError;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SpotifyToken {
    pub access_token: String,
    #[serde(default)]
    pub token_type: String,
    pub expires_in: i64,
    #[serde(default)]
    pub scope: Option<String>,
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>
}

impl SpotifyToken {
    /// Stamps the absolute expiry from the relative lifetime. A lifetime
    /// that does not fit a timestamp is rejected
    pub fn issued_at(mut self, now: DateTime<Utc>) -> Result<Self, SpotifyError> {
        let expires_at = Duration::try_seconds(self.expires_in)
            .and_then(|lifetime| now.checked_add_signed(lifetime))
            .ok_or_else(|| SpotifyError::new(
                format!("token exchange: expires_in out of range: {}", self.expires_in)
            ))?;
        self.expires_at = Some(expires_at);
        Ok(self)
    }

    /// Valid strictly before its expiry instant
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|expires_at| now < expires_at)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct Image {
    pub url: String,
    #[serde(default)]
    pub height: Option<u32>,
    #[serde(default)]
    pub width: Option<u32>
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct Followers {
    #[serde(default)]
    pub href: Option<String>,
    #[serde(default)]
    pub total: u64
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct ExternalUrls {
    #[serde(default)]
    pub spotify: Option<String>
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct ExternalIds {
    #[serde(default)]
    pub isrc: Option<String>,
    #[serde(default)]
    pub ean: Option<String>,
    #[serde(default)]
    pub upc: Option<String>
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct ArtistRef {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub external_urls: ExternalUrls,
    #[serde(default)]
    pub uri: String
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct SpotifyArtist {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub external_urls: ExternalUrls,
    #[serde(default)]
    pub href: Option<String>,
    #[serde(default)]
    pub uri: String,
    #[serde(default)]
    pub popularity: Option<u32>,
    #[serde(default)]
    pub genres: Vec<String>,
    #[serde(default)]
    pub followers: Option<Followers>,
    #[serde(default)]
    pub images: Vec<Image>
}

impl SpotifyArtist {
    pub fn follower_count(&self) -> u64 {
        self.followers.as_ref().map(|f| f.total).unwrap_or(0)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct SpotifyAlbum {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub album_type: String,
    #[serde(default)]
    pub album_group: Option<String>,
    #[serde(default)]
    pub release_date: String,
    #[serde(default)]
    pub release_date_precision: String,
    #[serde(default)]
    pub total_tracks: u32,
    #[serde(default)]
    pub images: Vec<Image>,
    #[serde(default)]
    pub artists: Vec<ArtistRef>,
    #[serde(default)]
    pub external_urls: ExternalUrls,
    #[serde(default)]
    pub uri: String,
    // full album only
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub popularity: Option<u32>,
    #[serde(default)]
    pub genres: Vec<String>
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct SpotifyTrack {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub duration_ms: u64,
    #[serde(default)]
    pub explicit: bool,
    #[serde(default)]
    pub artists: Vec<ArtistRef>,
    #[serde(default)]
    pub external_urls: ExternalUrls,
    #[serde(default)]
    pub uri: String,
    #[serde(default)]
    pub preview_url: Option<String>,
    #[serde(default)]
    pub disc_number: u32,
    #[serde(default)]
    pub track_number: u32,
    // full track only
    #[serde(default)]
    pub album: Option<SpotifyAlbum>,
    #[serde(default)]
    pub popularity: Option<u32>,
    #[serde(default)]
    pub external_ids: Option<ExternalIds>,
    #[serde(default)]
    pub is_playable: Option<bool>
}

/// Offset paging object returned by every Spotify listing
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Paging<T> {
    #[serde(default)]
    pub href: Option<String>,
    pub items: Vec<T>,
    #[serde(default)]
    pub limit: u32,
    #[serde(default)]
    pub next: Option<String>,
    #[serde(default)]
    pub offset: u32,
    #[serde(default)]
    pub previous: Option<String>,
    #[serde(default)]
    pub total: u32
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlbumType {
    Album,
    Single,
    Compilation,
    AppearsOn
}

impl AlbumType {
    pub fn as_str(self) -> &'static str {
        match self {
            AlbumType::Album => "album",
            AlbumType::Single => "single",
            AlbumType::Compilation => "compilation",
            AlbumType::AppearsOn => "appears_on"
        }
    }
}

/// Release counts per Spotify album type
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct AlbumCounts {
    pub album: u32,
    pub single: u32,
    pub compilation: u32,
    pub appears_on: u32,
    pub total: u32
}

impl AlbumCounts {
    /// Every album adds to total, known types also add to their bucket
    pub fn tally<'a, I>(album_types: I) -> Self
    where
        I: IntoIterator<Item = &'a str>
    {
        let mut counts = Self::default();
        for kind in album_types {
            match kind {
                "album" => counts.album += 1,
                "single" => counts.single += 1,
                "compilation" => counts.compilation += 1,
                "appears_on" => counts.appears_on += 1,
                _ => {}
            }
            counts.total += 1;
        }
        counts
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ArtistStats {
    pub artist: SpotifyArtist,
    pub album_counts: AlbumCounts,
    pub top_tracks: Vec<SpotifyTrack>,
    pub average_track_popularity: f64,
    pub genres: Vec<String>,
    pub followers: u64,
    pub popularity: Option<u32>
}

/// Mean popularity over tracks, a missing value counts as zero
pub fn average_popularity(tracks: &[SpotifyTrack]) -> f64 {
    if tracks.is_empty() {
        return 0.0;
    }
    let sum: u64 = tracks.iter().map(|t| t.popularity.unwrap_or(0) as u64).sum();
    sum as f64 / tracks.len() as f64
}

#[derive(Debug, Deserialize)]
pub(crate) struct ArtistSearch {
    pub artists: Paging<SpotifyArtist>
}

#[derive(Debug, Deserialize)]
pub(crate) struct TopTracks {
    pub tracks: Vec<SpotifyTrack>
}

#[derive(Debug, Deserialize)]
pub(crate) struct RelatedArtists {
    pub artists: Vec<SpotifyArtist>
}
