//!
//! src/matching/mod.rs
//!
//! Cross-provider entity matching. Spotify records are paired with
//! MusicBrainz records by fuzzy comparison of their normalized names
//!

pub mod sequence;

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;
use tracing::{debug, info};

use crate::config::MatchingConfig;
use crate::errors::{FlowError, MusicBrainzError};
use crate::musicbrainz::{
    MbArtist, MbRecording, MbRelease, MbReleaseGroup, MusicBrainzClient, ReleaseCounts,
    MB_DEFAULT_LIMIT,
};
use crate::spotify::{AlbumCounts, AlbumType, SpotifyAlbum, SpotifyArtist, SpotifyClient, SpotifyTrack};

pub use sequence::{similarity_ratio, SequenceMatcher};

pub const DEFAULT_SIMILARITY_THRESHOLD: f64 = 0.85;

static NON_WORD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^\w\s]").expect("static regex"));
static WHITESPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("static regex"));

/// Lowercased, punctuation dropped, single spaced
pub fn normalize_name(name: &str) -> String {
    let lowered = name.to_lowercase();
    let stripped = NON_WORD.replace_all(&lowered, "");
    WHITESPACE.replace_all(&stripped, " ").trim().to_string()
}

/// Similarity of two names in [0, 1]
pub fn name_similarity(a: &str, b: &str) -> f64 {
    similarity_ratio(&normalize_name(a), &normalize_name(b))
}

/// Records that can be matched by name or title
pub trait Named {
    fn match_name(&self) -> &str;
}

impl Named for SpotifyArtist {
    fn match_name(&self) -> &str { &self.name }
}

impl Named for SpotifyAlbum {
    fn match_name(&self) -> &str { &self.name }
}

impl Named for SpotifyTrack {
    fn match_name(&self) -> &str { &self.name }
}

impl Named for MbArtist {
    fn match_name(&self) -> &str { &self.name }
}

impl Named for MbReleaseGroup {
    fn match_name(&self) -> &str { &self.title }
}

impl Named for MbRelease {
    fn match_name(&self) -> &str { &self.title }
}

impl Named for MbRecording {
    fn match_name(&self) -> &str { &self.title }
}

impl Named for &str {
    fn match_name(&self) -> &str { self }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Scored<T> {
    pub item: T,
    pub score: f64
}

/// Highest scoring candidate if it reaches `threshold`. Ties keep the
/// earliest candidate
pub fn find_best_match<T: Named>(
    target: &str,
    candidates: impl IntoIterator<Item = T>,
    threshold: f64
) -> Option<Scored<T>> {
    let mut best: Option<Scored<T>> = None;
    for candidate in candidates {
        let score = name_similarity(target, candidate.match_name());
        let current = best.as_ref().map_or(0.0, |b| b.score);
        if score > current {
            best = Some(Scored { item: candidate, score });
        }
    }
    best.filter(|b| b.score >= threshold)
}

/// A Spotify record paired with its MusicBrainz counterpart
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchResult<S, M> {
    pub spotify: S,
    pub musicbrainz: M,
    pub similarity_score: f64
}

pub type AlbumMatch = MatchResult<SpotifyAlbum, MbReleaseGroup>;
pub type TrackMatch = MatchResult<SpotifyTrack, MbRecording>;

/// Spotify release counts as reported next to MusicBrainz. Appearances on
/// other artists' releases are only reflected in the total
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CatalogCounts {
    pub album: u32,
    pub single: u32,
    pub compilation: u32,
    pub total: u32
}

impl From<&AlbumCounts> for CatalogCounts {
    fn from(counts: &AlbumCounts) -> Self {
        Self {
            album: counts.album,
            single: counts.single,
            compilation: counts.compilation,
            total: counts.total
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ArtistComparison {
    pub spotify_artist: SpotifyArtist,
    pub musicbrainz_artist: MbArtist,
    /// The two artists are each provider's top search hit and are not
    /// matched against each other. A low score here means the comparison
    /// is likely between different artists
    pub artist_name_similarity: f64,
    pub spotify_album_counts: CatalogCounts,
    pub musicbrainz_album_counts: ReleaseCounts,
    pub album_matches: Vec<AlbumMatch>,
    pub track_matches: BTreeMap<String, TrackMatch>
}

pub struct EntityMatcher<'a> {
    spotify: &'a SpotifyClient,
    musicbrainz: &'a MusicBrainzClient,
    threshold: f64,
    max_album_matches: usize
}

impl<'a> EntityMatcher<'a> {
    pub fn new(spotify: &'a SpotifyClient, musicbrainz: &'a MusicBrainzClient) -> Self {
        Self {
            spotify,
            musicbrainz,
            threshold: DEFAULT_SIMILARITY_THRESHOLD,
            max_album_matches: 10
        }
    }

    pub fn with_config(mut self, cfg: &MatchingConfig) -> Self {
        self.threshold = cfg.similarity_threshold;
        self.max_album_matches = cfg.max_album_matches;
        self
    }

    pub fn threshold(&self) -> f64 { self.threshold }

    pub async fn find_musicbrainz_artist(&self, artist: &SpotifyArtist) ->
        Result<Option<Scored<MbArtist>>, MusicBrainzError> {
        let found = self.musicbrainz
            .search_artists(&artist.name, MB_DEFAULT_LIMIT, 0, false)
            .await?;
        Ok( find_best_match(&artist.name, found.artists, self.threshold) )
    }

    pub async fn find_release_match(&self, album: &SpotifyAlbum, artist_id: Option<&str>) ->
        Result<Option<Scored<MbRelease>>, MusicBrainzError> {
        let found = self.musicbrainz
            .search_releases(&album.name, artist_id, None, MB_DEFAULT_LIMIT, 0)
            .await?;
        Ok( find_best_match(&album.name, found.releases, self.threshold) )
    }

    pub async fn find_release_group_match(&self, album: &SpotifyAlbum, artist_id: Option<&str>) ->
        Result<Option<Scored<MbReleaseGroup>>, MusicBrainzError> {
        let found = self.musicbrainz
            .search_release_groups(&album.name, artist_id, MB_DEFAULT_LIMIT, 0, false)
            .await?;
        Ok( find_best_match(&album.name, found.release_groups, self.threshold) )
    }

    /// Matched recordings keyed by Spotify track id. Tracks without a
    /// match above the threshold are left out
    pub async fn find_track_matches(&self, tracks: &[SpotifyTrack], artist_id: Option<&str>) ->
        Result<BTreeMap<String, TrackMatch>, MusicBrainzError> {
        let mut matches = BTreeMap::new();
        for track in tracks {
            let found = self.musicbrainz
                .search_recordings(&track.name, artist_id, None, MB_DEFAULT_LIMIT, 0)
                .await?;
            if let Some(best) = find_best_match(&track.name, found.recordings, self.threshold) {
                matches.insert(track.id.clone(), MatchResult {
                    spotify: track.clone(),
                    musicbrainz: best.item,
                    similarity_score: best.score
                });
            }
        }
        Ok(matches)
    }

    /// Side by side view of one artist on both providers, using each
    /// provider's first search hit
    pub async fn compare_artist_data(&self, artist_name: &str) ->
        Result<ArtistComparison, FlowError> {
        let spotify_hits = self.spotify.search_artists(artist_name, 10, 0).await?;
        let mb_hits = self.musicbrainz
            .search_artists(artist_name, MB_DEFAULT_LIMIT, 0, false)
            .await?;

        let (Some(spotify_artist), Some(musicbrainz_artist)) =
            (spotify_hits.into_iter().next(), mb_hits.artists.into_iter().next())
        else {
            return Err(FlowError::NotFound(
                "Artist not found on one or both platforms".to_string()
            ));
        };
        let artist_name_similarity =
            name_similarity(&spotify_artist.name, &musicbrainz_artist.name);
        debug!(
            spotify = %spotify_artist.name,
            musicbrainz = %musicbrainz_artist.name,
            artist_name_similarity,
            "matching.compare.artists"
        );

        let stats = self.spotify.get_artist_stats(&spotify_artist.id, None).await?;
        let info = self.musicbrainz.get_artist_info(&musicbrainz_artist.id).await?;

        let albums = self.spotify
            .get_all_artist_albums(&spotify_artist.id, &[AlbumType::Album])
            .await?;
        let mut album_matches = Vec::new();
        for album in albums.into_iter().take(self.max_album_matches) {
            let found = self
                .find_release_group_match(&album, Some(&musicbrainz_artist.id))
                .await?;
            if let Some(best) = found {
                album_matches.push(MatchResult {
                    spotify: album,
                    musicbrainz: best.item,
                    similarity_score: best.score
                });
            }
        }

        let track_matches = self
            .find_track_matches(&stats.top_tracks, Some(&musicbrainz_artist.id))
            .await?;

        info!(
            artist = %spotify_artist.name,
            albums = album_matches.len(),
            tracks = track_matches.len(),
            "matching.compare.done"
        );
        Ok( ArtistComparison {
            spotify_artist,
            musicbrainz_artist,
            artist_name_similarity,
            spotify_album_counts: CatalogCounts::from(&stats.album_counts),
            musicbrainz_album_counts: info.release_group_counts,
            album_matches,
            track_matches
        })
    }
}
