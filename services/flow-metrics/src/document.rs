//!
//! src/document.rs
//!
//! The stored artist document. One per Spotify artist id, carrying the
//! Spotify profile, release summaries and, when a confident MusicBrainz
//! match exists, the MusicBrainz details
//!

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::FlowError;
use crate::musicbrainz::{LifeSpan, MbArtist, ReleaseCounts};
use crate::spotify::{AlbumCounts, SpotifyAlbum, SpotifyArtist, SpotifyTrack};
use crate::spotify::models::ExternalUrls;

pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

pub fn timestamp(now: DateTime<Utc>) -> String {
    now.format(TIMESTAMP_FORMAT).to_string()
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct AlbumSummary {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub release_date: String,
    #[serde(default)]
    pub total_tracks: u32,
    #[serde(default)]
    pub album_type: String,
    #[serde(default)]
    pub image: Option<String>
}

impl From<&SpotifyAlbum> for AlbumSummary {
    fn from(album: &SpotifyAlbum) -> Self {
        Self {
            id: album.id.clone(),
            name: album.name.clone(),
            release_date: album.release_date.clone(),
            total_tracks: album.total_tracks,
            album_type: album.album_type.clone(),
            image: album.images.first().map(|i| i.url.clone())
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct TrackAlbum {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub release_date: String
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct TrackSummary {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub popularity: Option<u32>,
    #[serde(default)]
    pub explicit: bool,
    #[serde(default)]
    pub duration_ms: u64,
    #[serde(default)]
    pub album: Option<TrackAlbum>
}

impl From<&SpotifyTrack> for TrackSummary {
    fn from(track: &SpotifyTrack) -> Self {
        Self {
            id: track.id.clone(),
            name: track.name.clone(),
            popularity: track.popularity,
            explicit: track.explicit,
            duration_ms: track.duration_ms,
            album: track.album.as_ref().map(|a| TrackAlbum {
                id: a.id.clone(),
                name: a.name.clone(),
                release_date: a.release_date.clone()
            })
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct ArtistDocument {
    pub spotify_id: String,
    pub name: String,
    #[serde(default)]
    pub genres: Vec<String>,
    #[serde(default)]
    pub spotify_popularity: u32,
    #[serde(default)]
    pub spotify_followers: u64,
    #[serde(default)]
    pub spotify_uri: String,
    #[serde(default)]
    pub external_urls: ExternalUrls,

    // musicbrainz, only with a confident match
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mbid: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disambiguation: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub life_span: Option<LifeSpan>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub release_counts: Option<BTreeMap<String, u32>>,

    #[serde(default)]
    pub albums: Vec<AlbumSummary>,
    #[serde(default)]
    pub singles: Vec<AlbumSummary>,
    #[serde(default)]
    pub compilations: Vec<AlbumSummary>,
    #[serde(default)]
    pub top_tracks: Vec<TrackSummary>,
    #[serde(default)]
    pub image_uri: Option<String>,
    #[serde(default)]
    pub last_updated: Option<String>
}

fn release_count_map(counts: &ReleaseCounts) -> BTreeMap<String, u32> {
    [
        ("album", counts.album),
        ("single", counts.single),
        ("ep", counts.ep),
        ("compilation", counts.compilation),
        ("soundtrack", counts.soundtrack),
        ("live", counts.live),
        ("remix", counts.remix),
        ("other", counts.other),
        ("total", counts.total),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v))
    .collect()
}

fn album_count_map(counts: &AlbumCounts) -> BTreeMap<String, u32> {
    [
        ("album", counts.album),
        ("single", counts.single),
        ("compilation", counts.compilation),
        ("appears_on", counts.appears_on),
        ("total", counts.total),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v))
    .collect()
}

fn newest_first(items: &mut [AlbumSummary]) {
    items.sort_by(|a, b| b.release_date.cmp(&a.release_date));
}

impl ArtistDocument {
    pub fn from_spotify(artist: &SpotifyArtist) -> Self {
        Self {
            spotify_id: artist.id.clone(),
            name: artist.name.clone(),
            genres: artist.genres.clone(),
            spotify_popularity: artist.popularity.unwrap_or(0),
            spotify_followers: artist.follower_count(),
            spotify_uri: artist.uri.clone(),
            external_urls: artist.external_urls.clone(),
            image_uri: artist.images.first().map(|i| i.url.clone()),
            ..Default::default()
        }
    }

    pub fn set_top_tracks(&mut self, tracks: &[SpotifyTrack]) {
        self.top_tracks = tracks.iter().map(TrackSummary::from).collect();
    }

    /// Sorts releases into albums, singles and compilations. Releases the
    /// artist only appears on are left out
    pub fn set_releases(&mut self, releases: &[SpotifyAlbum]) {
        self.albums.clear();
        self.singles.clear();
        self.compilations.clear();

        for release in releases {
            let group = release.album_group.as_deref().unwrap_or(&release.album_type);
            match group {
                "album" => self.albums.push(release.into()),
                "single" => self.singles.push(release.into()),
                "compilation" => self.compilations.push(release.into()),
                _ => {}
            }
        }
    }

    /// Spotify counts are kept only until MusicBrainz counts arrive
    pub fn set_spotify_counts(&mut self, counts: &AlbumCounts) {
        if self.release_counts.is_none() {
            self.release_counts = Some(album_count_map(counts));
        }
    }

    pub fn set_musicbrainz(&mut self, artist: &MbArtist, counts: &ReleaseCounts) {
        self.mbid = Some(artist.id.clone());
        self.disambiguation = artist.disambiguation.clone();
        self.country = artist.country.clone();
        self.kind = artist.kind.clone();
        self.life_span = artist.life_span.clone();
        self.release_counts = Some(release_count_map(counts));
    }

    pub fn has_musicbrainz(&self) -> bool {
        self.mbid.is_some()
    }

    /// Releases newest first and a timestamp when none was recorded
    pub fn normalize(&mut self, now: DateTime<Utc>) {
        newest_first(&mut self.albums);
        newest_first(&mut self.singles);
        newest_first(&mut self.compilations);
        if self.last_updated.is_none() {
            self.last_updated = Some(timestamp(now));
        }
    }

    pub fn to_json(&self) -> Result<String, FlowError> {
        Ok( serde_json::to_string(self)? )
    }
}

/// Older documents nested the MusicBrainz fields and kept every image
#[derive(Debug, Default, Deserialize)]
struct NestedMusicBrainz {
    id: Option<String>,
    #[serde(default)]
    disambiguation: Option<String>,
    #[serde(default)]
    country: Option<String>,
    #[serde(default, rename = "type")]
    kind: Option<String>,
    #[serde(default)]
    life_span: Option<LifeSpan>,
    #[serde(default)]
    release_counts: Option<BTreeMap<String, u32>>
}

#[derive(Debug, Deserialize)]
struct StoredArtist {
    #[serde(flatten)]
    doc: ArtistDocument,
    #[serde(default)]
    musicbrainz_info: Option<NestedMusicBrainz>,
    #[serde(default)]
    spotify_images: Vec<String>,
    #[serde(default)]
    album_counts: Option<BTreeMap<String, u32>>
}

/// Rebuilds a stored document, old nested layout included, in the
/// current shape
pub fn cleanup_document(raw: &Value, now: DateTime<Utc>) -> Result<ArtistDocument, FlowError> {
    let stored: StoredArtist = serde_json::from_value(raw.clone())?;
    let mut doc = stored.doc;

    if let Some(mb) = stored.musicbrainz_info {
        doc.mbid = mb.id.or(doc.mbid);
        doc.disambiguation = mb.disambiguation.or(doc.disambiguation);
        doc.country = mb.country.or(doc.country);
        doc.kind = mb.kind.or(doc.kind);
        doc.life_span = mb.life_span.or(doc.life_span);
        if let Some(counts) = mb.release_counts.filter(|c| !c.is_empty()) {
            doc.release_counts = Some(counts);
        }
    }
    if doc.release_counts.is_none() {
        doc.release_counts = stored.album_counts.filter(|c| !c.is_empty());
    }
    if doc.image_uri.is_none() {
        doc.image_uri = stored.spotify_images.into_iter().next();
    }

    doc.normalize(now);
    Ok(doc)
}
