//!
//! src/collect.rs
//!
//! Batch drivers over the document store. `run_collect` seeds hip-hop
//! artists from Spotify, enriches each with MusicBrainz and upserts the
//! result. `run_cleanup` rewrites stored documents into the current shape
//!

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use crate::config::MatchingConfig;
use crate::document::{cleanup_document, ArtistDocument};
use crate::errors::{FlowError, MusicBrainzError};
use crate::musicbrainz::{MbArtist, MusicBrainzClient, MB_DEFAULT_LIMIT};
use crate::persistent::{Persistent, Upsert};
use crate::spotify::{album_kind, AlbumCounts, SpotifyArtist, SpotifyClient};

/// Always searched first, one result each
pub const NOTABLE_ARTISTS: [&str; 11] = [
    "Kendrick Lamar",
    "Jay-Z",
    "Kanye West",
    "Drake",
    "Nas",
    "Tupac Shakur",
    "The Notorious B.I.G.",
    "Eminem",
    "Run-DMC",
    "Wu-Tang Clan",
    "A Tribe Called Quest",
];

/// Spotify `genre:` searches used to fill the pool past the notable list
pub const GENRE_TERMS: [&str; 8] = [
    "hip hop",
    "rap",
    "trap",
    "drill",
    "conscious rap",
    "gangsta rap",
    "boom bap",
    "horrorcore",
];

/// An artist from a genre search is kept when any genre mentions one of these
pub const GENRE_KEYWORDS: [&str; 4] = ["hip hop", "rap", "trap", "drill"];

/// Candidate pool is three times the requested count, capped here
pub const MAX_SEARCH_POOL: usize = 150;

const GENRE_PAGE: usize = 20;

pub fn is_hip_hop(artist: &SpotifyArtist) -> bool {
    let genres = artist.genres.join(" ").to_lowercase();
    GENRE_KEYWORDS.iter().any(|keyword| genres.contains(keyword))
}

/// Up to `limit` distinct artists, notable ones first. Failed searches are
/// logged and skipped
pub async fn search_hip_hop_artists(spotify: &SpotifyClient, limit: usize) -> Vec<SpotifyArtist> {
    let mut artists: Vec<SpotifyArtist> = Vec::new();
    let mut seen: HashSet<String> = HashSet::new();

    for name in NOTABLE_ARTISTS {
        if artists.len() >= limit {
            break;
        }
        match spotify.search_artists(name, 1, 0).await {
            Ok(found) => {
                if let Some(artist) = found.into_iter().next() {
                    if seen.insert(artist.id.clone()) {
                        debug!(artist = %artist.name, "collect.notable_added");
                        artists.push(artist);
                    }
                }
            }
            Err(e) => warn!(error = %e, artist = name, "collect.notable_failed")
        }
    }

    for term in GENRE_TERMS {
        if artists.len() >= limit {
            break;
        }
        let page = GENRE_PAGE.min(limit - artists.len()) as u32;
        let found = match spotify.search_artists(&format!("genre:{term}"), page, 0).await {
            Ok(found) => found,
            Err(e) => {
                warn!(error = %e, term, "collect.genre_search_failed");
                continue;
            }
        };

        for artist in found {
            if !is_hip_hop(&artist) || !seen.insert(artist.id.clone()) {
                continue;
            }
            debug!(artist = %artist.name, term, "collect.search_added");
            artists.push(artist);
            if artists.len() >= limit {
                break;
            }
        }
    }

    info!(found = artists.len(), limit, "collect.search_done");
    artists
}

/// Highest scored MusicBrainz hit for the name, accepted only when its
/// score is strictly above `min_score`
pub async fn best_musicbrainz_artist(
    musicbrainz: &MusicBrainzClient,
    name: &str,
    min_score: u32
) -> Result<Option<MbArtist>, MusicBrainzError> {
    let found = musicbrainz.search_artists(name, MB_DEFAULT_LIMIT, 0, false).await?;

    let mut best: Option<MbArtist> = None;
    let mut highest = 0;
    for artist in found.artists {
        let score = artist.score.unwrap_or(0);
        if score > highest {
            highest = score;
            best = Some(artist);
        }
    }
    Ok( best.filter(|_| highest > min_score) )
}

/// Full document for one artist. Every provider call that fails leaves
/// its part of the document empty
pub async fn build_artist_document(
    spotify: &SpotifyClient,
    musicbrainz: &MusicBrainzClient,
    artist: &SpotifyArtist,
    matching: &MatchingConfig
) -> ArtistDocument {
    let mut doc = ArtistDocument::from_spotify(artist);

    match spotify.get_all_artist_albums(&artist.id, &[]).await {
        Ok(releases) => {
            doc.set_releases(&releases);
            doc.set_spotify_counts(&AlbumCounts::tally(releases.iter().map(album_kind)));
        }
        Err(e) => warn!(error = %e, artist = %artist.name, "collect.albums_failed")
    }

    match spotify.get_artist_top_tracks(&artist.id, None).await {
        Ok(tracks) => doc.set_top_tracks(&tracks),
        Err(e) => warn!(error = %e, artist = %artist.name, "collect.top_tracks_failed")
    }

    let matched = match best_musicbrainz_artist(musicbrainz, &artist.name, matching.min_provider_score).await {
        Ok(matched) => matched,
        Err(e) => {
            warn!(error = %e, artist = %artist.name, "collect.musicbrainz_search_failed");
            None
        }
    };
    if let Some(mb_artist) = matched {
        match musicbrainz.get_artist_info(&mb_artist.id).await {
            Ok(info) => doc.set_musicbrainz(&mb_artist, &info.release_group_counts),
            Err(e) => warn!(error = %e, mbid = %mb_artist.id, "collect.musicbrainz_info_failed")
        }
    }

    doc.normalize(Utc::now());
    doc
}

#[derive(Debug, Clone, Copy)]
pub struct CollectOptions {
    pub limit: usize,
    pub skip_existing: bool,
    pub dry_run: bool
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CollectSummary {
    pub candidates: usize,
    pub skipped: usize,
    pub inserted: usize,
    pub updated: usize,
    pub dry_run: usize
}

pub async fn run_collect(
    spotify: &SpotifyClient,
    musicbrainz: &MusicBrainzClient,
    store: &Persistent,
    matching: &MatchingConfig,
    opts: CollectOptions
) -> Result<CollectSummary, FlowError> {
    let existing = store.count().await?;
    let pool_size = (opts.limit * 3).min(MAX_SEARCH_POOL);
    info!(existing, pool_size, limit = opts.limit, "collect.start");

    let candidates = search_hip_hop_artists(spotify, pool_size).await;
    let mut summary = CollectSummary { candidates: candidates.len(), ..Default::default() };

    let mut selected = Vec::new();
    for artist in candidates {
        if selected.len() >= opts.limit {
            break;
        }
        if opts.skip_existing && store.exists(&artist.id).await? {
            summary.skipped += 1;
            continue;
        }
        selected.push(artist);
    }

    if selected.is_empty() {
        info!("collect.nothing_to_do");
        return Ok(summary);
    }

    for (i, artist) in selected.iter().enumerate() {
        info!(artist = %artist.name, n = i + 1, of = selected.len(), "collect.artist");
        let doc = build_artist_document(spotify, musicbrainz, artist, matching).await;

        if opts.dry_run {
            info!(
                artist = %doc.name,
                albums = doc.albums.len(),
                singles = doc.singles.len(),
                musicbrainz = doc.has_musicbrainz(),
                "collect.dry_run"
            );
            summary.dry_run += 1;
            continue;
        }

        match store.upsert_artist(&doc).await? {
            Upsert::Inserted(id) => {
                info!(artist = %doc.name, %id, "collect.inserted");
                summary.inserted += 1;
            }
            Upsert::Updated(id) => {
                info!(artist = %doc.name, %id, "collect.updated");
                summary.updated += 1;
            }
        }
    }

    let total = store.count().await?;
    info!(?summary, total, "collect.done");
    Ok(summary)
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CleanupSummary {
    pub scanned: usize,
    pub changed: usize,
    pub unchanged: usize,
    pub failed: usize
}

/// Rewrites every stored document into the current shape. Documents that
/// cannot be rebuilt are logged and left alone
pub async fn run_cleanup(
    store: &Persistent,
    dry_run: bool,
    now: DateTime<Utc>
) -> Result<CleanupSummary, FlowError> {
    let rows = store.all_raw().await?;
    let mut summary = CleanupSummary { scanned: rows.len(), ..Default::default() };

    for row in rows {
        let doc = match cleanup_document(&row.raw, now) {
            Ok(doc) => doc,
            Err(e) => {
                warn!(error = %e, id = %row.id, name = %row.name, "cleanup.failed");
                summary.failed += 1;
                continue;
            }
        };

        let changed = if dry_run {
            serde_json::to_value(&doc)? != row.raw
        } else {
            store.replace(&row.id, &doc).await?
        };

        if changed {
            debug!(id = %row.id, name = %doc.name, dry_run, "cleanup.changed");
            summary.changed += 1;
        } else {
            summary.unchanged += 1;
        }
    }

    info!(?summary, dry_run, "cleanup.done");
    Ok(summary)
}
