//!
//! src/main.rs
//!
//! Command line driver: artist collection and cleanup over the document
//! store, stored document queries, cross-provider comparison, lyrics
//! lookup and vocabulary analysis
//!

use std::process::ExitCode;

use chrono::Utc;
use clap::{Parser, Subcommand};
use serde_json::json;
use tracing::{error, info};

use flow_metrics::collect::{run_cleanup, run_collect, CollectOptions};
use flow_metrics::config::{self, AppConfig};
use flow_metrics::document::ArtistDocument;
use flow_metrics::errors::FlowError;
use flow_metrics::logging;
use flow_metrics::lyrics::{LyricsScraper, ScrapedLyrics, DEFAULT_MAX_SONGS};
use flow_metrics::matching::EntityMatcher;
use flow_metrics::musicbrainz::MusicBrainzClient;
use flow_metrics::persistent::Persistent;
use flow_metrics::spotify::SpotifyClient;
use flow_metrics::vocabulary::{aggregate, analyze, calculate_vocabulary_richness};

#[derive(Parser, Debug)]
#[command(name = "flow-metrics", version, about = "Hip-hop artist metadata and lyrics analysis")]
struct Cli {
    #[command(subcommand)]
    command: Command
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Collect hip-hop artists from Spotify and MusicBrainz into the store
    Collect {
        #[arg(long, default_value_t = 50)]
        limit: usize,
        /// Leave artists already in the store untouched
        #[arg(long)]
        skip_existing: bool,
        #[arg(long)]
        dry_run: bool
    },
    /// Rewrite stored documents into the current layout
    Cleanup {
        #[arg(long)]
        dry_run: bool
    },
    /// Query stored artists
    View {
        /// Case-insensitive name substring
        #[arg(long)]
        name: Option<String>,
        /// Case-insensitive genre substring
        #[arg(long)]
        genre: Option<String>,
        /// Only print the number of stored artists
        #[arg(long)]
        count: bool,
        /// Print whole documents instead of a summary line
        #[arg(long)]
        details: bool,
        #[arg(long, default_value_t = 20)]
        limit: usize
    },
    /// Compare an artist across Spotify and MusicBrainz
    Compare {
        artist: String
    },
    /// Lyrics for one song from the first source that has it
    Lyrics {
        artist: String,
        title: String
    },
    /// Vocabulary metrics over an artist's scraped lyrics
    Vocab {
        artist: String,
        #[arg(long, default_value_t = DEFAULT_MAX_SONGS)]
        max_songs: usize,
        /// Second artist whose lyrics serve as the richness baseline
        #[arg(long)]
        baseline: Option<String>
    }
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<(), FlowError> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn summary_line(doc: &ArtistDocument) -> String {
    format!(
        "{:<32} {:>3} popularity  {:>10} followers  {} albums  {} singles  {}",
        doc.name,
        doc.spotify_popularity,
        doc.spotify_followers,
        doc.albums.len(),
        doc.singles.len(),
        doc.genres.join(", ")
    )
}

async fn view(
    store: &Persistent,
    name: Option<String>,
    genre: Option<String>,
    count: bool,
    details: bool,
    limit: usize
) -> Result<(), FlowError> {
    if count {
        println!("{}", store.count().await?);
        return Ok(());
    }

    let docs = match (name, genre) {
        (Some(name), _) => store.find_by_name(&name).await?,
        (None, Some(genre)) => store.find_by_genre(&genre).await?,
        (None, None) => store.all(Some(limit as i64)).await?
    };

    if docs.is_empty() {
        info!("view.no_results");
        return Ok(());
    }

    for doc in docs.iter().take(limit) {
        if details {
            print_json(doc)?;
        } else {
            println!("{}", summary_line(doc));
        }
    }
    Ok(())
}

fn joined_lyrics(songs: &[ScrapedLyrics]) -> String {
    songs.iter().map(|s| s.lyrics.as_str()).collect::<Vec<_>>().join("\n")
}

async fn vocab(
    scraper: &LyricsScraper,
    artist: &str,
    max_songs: usize,
    baseline: Option<&str>
) -> Result<(), FlowError> {
    let songs = scraper.get_artist_lyrics(artist, max_songs).await?;
    let per_song: Vec<_> = songs.iter()
        .map(|s| json!({ "title": s.title, "metrics": analyze(&s.lyrics) }))
        .collect();
    let metrics: Vec<_> = songs.iter().map(|s| analyze(&s.lyrics)).collect();
    let overall = analyze(&joined_lyrics(&songs));

    let richness = match baseline {
        Some(other) => {
            let base_songs = scraper.get_artist_lyrics(other, max_songs).await?;
            let base = analyze(&joined_lyrics(&base_songs));
            Some(calculate_vocabulary_richness(&overall, &base))
        }
        None => None
    };

    print_json(&json!({
        "artist": artist,
        "songs": per_song,
        "average": aggregate(&metrics),
        "overall": overall,
        "baseline": baseline,
        "richness_vs_baseline": richness
    }))
}

async fn run(cli: Cli, cfgs: &AppConfig) -> Result<(), FlowError> {
    match cli.command {
        Command::Collect { limit, skip_existing, dry_run } => {
            let spotify = SpotifyClient::from_config(cfgs)?;
            let musicbrainz = MusicBrainzClient::from_config(cfgs)?;
            let store = Persistent::from_config(&cfgs.persistence).await?;
            let opts = CollectOptions { limit, skip_existing, dry_run };

            let summary = run_collect(&spotify, &musicbrainz, &store, &cfgs.matching, opts).await?;
            println!(
                "candidates {}  skipped {}  inserted {}  updated {}  dry-run {}",
                summary.candidates, summary.skipped, summary.inserted, summary.updated, summary.dry_run
            );
        }
        Command::Cleanup { dry_run } => {
            let store = Persistent::from_config(&cfgs.persistence).await?;
            let summary = run_cleanup(&store, dry_run, Utc::now()).await?;
            println!(
                "scanned {}  changed {}  unchanged {}  failed {}",
                summary.scanned, summary.changed, summary.unchanged, summary.failed
            );
        }
        Command::View { name, genre, count, details, limit } => {
            let store = Persistent::from_config(&cfgs.persistence).await?;
            view(&store, name, genre, count, details, limit).await?;
        }
        Command::Compare { artist } => {
            let spotify = SpotifyClient::from_config(cfgs)?;
            let musicbrainz = MusicBrainzClient::from_config(cfgs)?;
            let comparison = EntityMatcher::new(&spotify, &musicbrainz)
                .with_config(&cfgs.matching)
                .compare_artist_data(&artist)
                .await?;
            print_json(&comparison)?;
        }
        Command::Lyrics { artist, title } => {
            let scraper = LyricsScraper::from_config(cfgs)?;
            let found = scraper.get_song_lyrics(&artist, &title).await?;
            println!("{} - {} ({})\n{}\n\n{}", found.artist, found.title, found.source, found.url, found.lyrics);
        }
        Command::Vocab { artist, max_songs, baseline } => {
            let scraper = LyricsScraper::from_config(cfgs)?;
            vocab(&scraper, &artist, max_songs, baseline.as_deref()).await?;
        }
    }
    Ok(())
}

/// Error followed by each of its sources
fn error_chain(e: &FlowError) -> String {
    let mut chain = e.to_string();
    let mut source = std::error::Error::source(e);
    while let Some(cause) = source {
        chain.push_str(": ");
        chain.push_str(&cause.to_string());
        source = cause.source();
    }
    chain
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let cfgs = match config::load_config() {
        Ok(cfgs) => cfgs,
        Err(e) => {
            eprintln!("flow-metrics: {}", error_chain(&e));
            return ExitCode::FAILURE;
        }
    };
    let _guard = match logging::init_logging(&cfgs.logging) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("flow-metrics: {}", error_chain(&e));
            return ExitCode::FAILURE;
        }
    };

    info!(
        service = "flow-metrics",
        version = %env!("CARGO_PKG_VERSION"),
        command = ?cli.command,
        "starting"
    );

    match run(cli, &cfgs).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %error_chain(&e), provider = e.is_provider(), "failed");
            ExitCode::FAILURE
        }
    }
}
