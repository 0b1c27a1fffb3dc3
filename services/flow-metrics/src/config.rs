//!
//! src/config.rs
//!
//! Loads every setting the aggregator needs once at startup. Values come
//! from the process environment (with .env support), everything else
//! falls back to the constants below
//!

use url::Url;
use std::time;
use crate::errors::FlowError;

/// Constants for HTTP Config
pub const HTTP_TIMEOUT: u64 = 30000;
pub const HTTP_CONNECT_TIMEOUT: u64 = 5000;
pub const HTTP_POOL_MAX_IDLE: usize = 16;
pub const HTTP_POOL_IDLE_TIMEOUT: u64 = 90000;
pub const HTTP_MAX_REDIRECTS: u8 = 4;

/// Constants for provider pacing
pub const MB_MIN_INTERVAL: u64 = 1000;
pub const SCRAPER_MIN_INTERVAL: u64 = 2000;
pub const SCRAPER_JITTER_MIN: u64 = 100;
pub const SCRAPER_JITTER_MAX: u64 = 1000;
pub const SCRAPER_TIMEOUT: u64 = 10000;

/// Source of raw settings, std::env in production and a map in tests
pub type Lookup<'a> = &'a dyn Fn(&str) -> Option<String>;

/// Returns an invalid environment var error for missing or blank values
fn env_check(env: Lookup, s: &str) -> Result<String, FlowError> {
    match env(s) {
        Some(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(FlowError::Config(format!("{s} was not set"))),
    }
}

fn env_optional(env: Lookup, s: &str) -> Option<String> {
    env(s).filter(|v| !v.trim().is_empty())
}

fn env_or(env: Lookup, s: &str, default: &str) -> String {
    env_optional(env, s).unwrap_or_else(|| default.to_string())
}

fn env_to_uint(env: Lookup, s: &str, default: u64) -> u64 {
    match env(s) {
        Some(v) => v.trim().parse::<u64>().unwrap_or(default),
        None => default
    }
}

fn env_to_float(env: Lookup, s: &str, default: f64) -> f64 {
    match env(s) {
        Some(v) => v.trim().parse::<f64>().unwrap_or(default),
        None => default
    }
}

fn env_to_bool(env: Lookup, s: &str, default: bool) -> bool {
    match env(s).as_deref().map(str::trim) {
        Some("1") | Some("true") | Some("yes") => true,
        Some("0") | Some("false") | Some("no") => false,
        _ => default
    }
}

/// Ensures that url is https
fn ensure_https(url: &Url) -> Result<(), String> {
    if url.scheme() == "https" {
        Ok(())
    } else {
        Err(format!("URL must be https: {url}"))
    }
}

fn ensure_host(url: &Url, expected_host: &str) -> Result<(), String> {
    match url.host_str() {
        Some(h) if h.eq_ignore_ascii_case(expected_host) => Ok(()),
        Some(h) => Err(
            format!("Unexpected host for {url} (got {h}, expected {expected_host})")
        ),
        None => Err(format!("URL missing host: {url}"))
    }
}

/// Parses a base url, validates scheme and host, and forces the trailing
/// slash that Url::join needs to keep the last path segment
fn base_url(raw: &str, key: &str, host: &str) -> Result<Url, FlowError> {
    let mut url = Url::parse(raw)
        .map_err(|e| FlowError::Config(format!("{key} invalid {e}")))?;

    ensure_https(&url).map_err(FlowError::Config)?;
    ensure_host(&url, host).map_err(FlowError::Config)?;

    if !url.path().ends_with('/') {
        let mut path = url.path().to_string();
        path.push('/');
        url.set_path(&path);
    }
    Ok(url)
}

/// Configuration that Spotify expects when hitting endpoints. Credentials
/// are optional here, the client refuses to build without them
#[derive(Debug, Clone)]
pub struct SpotifyConfig {
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub token_url: Url,
    pub api_base: Url,
    pub market: String,
}

fn build_spotify(env: Lookup) -> Result<SpotifyConfig, FlowError> {
    let client_id     = env_optional(env, "SPOTIFY_CLIENT_ID");
    let client_secret = env_optional(env, "SPOTIFY_CLIENT_SECRET");

    let token_url = env_or(env, "SPOTIFY_TOKEN_URL", "https://accounts.spotify.com/api/token");
    let token_url = Url::parse(&token_url)
        .map_err(|_| FlowError::Config("SPOTIFY_TOKEN_URL invalid".to_string()))?;
    ensure_https(&token_url).map_err(FlowError::Config)?;
    ensure_host(&token_url, "accounts.spotify.com").map_err(FlowError::Config)?;

    let api_base = base_url(
        &env_or(env, "SPOTIFY_API_BASE", "https://api.spotify.com/v1/"),
        "SPOTIFY_API_BASE",
        "api.spotify.com"
    )?;
    let market = env_or(env, "SPOTIFY_MARKET", "US");

    Ok( SpotifyConfig { client_id, client_secret, token_url, api_base, market })
}

///
/// Configuration for musicbrainz api
///
#[derive(Debug, Clone)]
pub struct MusicBrainzConfig {
    pub base_url: Url,             // https://musicbrainz.org/ws/2/
    pub cover_art_url: Url,        // https://coverartarchive.org/
    pub user_agent: String,        // app/version (contact)
    pub min_interval: time::Duration
}

fn build_musicbrainz(env: Lookup) -> Result<MusicBrainzConfig, FlowError> {
    let base = base_url(
        &env_or(env, "MB_BASE_URL", "https://musicbrainz.org/ws/2/"),
        "MB_BASE_URL",
        "musicbrainz.org"
    )?;
    let cover_art_url = base_url(
        &env_or(env, "COVER_ART_BASE_URL", "https://coverartarchive.org/"),
        "COVER_ART_BASE_URL",
        "coverartarchive.org"
    )?;

    let application = env_or(env, "MUSICBRAINZ_APP_NAME", "FlowMetrics");
    let version     = env_or(env, "MUSICBRAINZ_VERSION", "1.0");
    let contact     = env_or(env, "MUSICBRAINZ_CONTACT", "flowmetrics@example.com");
    let user_agent  = format!("{application}/{version} ({contact})");

    let min_interval = time::Duration::from_millis(
        env_to_uint(env, "MB_MIN_INTERVAL_MS", MB_MIN_INTERVAL)
    );

    Ok( MusicBrainzConfig { base_url: base, cover_art_url, user_agent, min_interval })
}

#[derive(Debug, Clone)]
pub struct MusixmatchConfig {
    pub api_key: Option<String>,
    pub base_url: Url
}

fn build_musixmatch(env: Lookup) -> Result<MusixmatchConfig, FlowError> {
    let api_key  = env_optional(env, "MUSIXMATCH_API_KEY");
    let base_url = base_url(
        &env_or(env, "MUSIXMATCH_BASE_URL", "https://api.musixmatch.com/ws/1.1/"),
        "MUSIXMATCH_BASE_URL",
        "api.musixmatch.com"
    )?;
    Ok( MusixmatchConfig { api_key, base_url } )
}

///
/// Pacing and timeouts for the lyrics page scraper
///
#[derive(Debug, Clone)]
pub struct ScraperConfig {
    pub min_interval: time::Duration,
    pub jitter_min: time::Duration,
    pub jitter_max: time::Duration,
    pub timeout: time::Duration
}

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            min_interval: time::Duration::from_millis(SCRAPER_MIN_INTERVAL),
            jitter_min: time::Duration::from_millis(SCRAPER_JITTER_MIN),
            jitter_max: time::Duration::from_millis(SCRAPER_JITTER_MAX),
            timeout: time::Duration::from_millis(SCRAPER_TIMEOUT)
        }
    }
}

fn build_scraper(env: Lookup) -> ScraperConfig {
    let default = ScraperConfig::default();
    let ms = |key: &str, d: time::Duration| {
        time::Duration::from_millis(env_to_uint(env, key, d.as_millis() as u64))
    };
    ScraperConfig {
        min_interval: ms("SCRAPER_MIN_INTERVAL_MS", default.min_interval),
        jitter_min: ms("SCRAPER_JITTER_MIN_MS", default.jitter_min),
        jitter_max: ms("SCRAPER_JITTER_MAX_MS", default.jitter_max),
        timeout: ms("SCRAPER_TIMEOUT_MS", default.timeout)
    }
}

///
/// Configuration for Http timeouts and pooling
///
#[derive(Debug, Clone)]
pub struct HttpConfig {
    pub timeout: time::Duration,
    pub connect_timeout: time::Duration,
    pub pool_max_idle_per_host: usize,
    pub pool_idle_timeout: time::Duration,
    pub max_redirects: u8,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout: time::Duration::from_millis(HTTP_TIMEOUT),
            connect_timeout: time::Duration::from_millis(HTTP_CONNECT_TIMEOUT),
            pool_max_idle_per_host: HTTP_POOL_MAX_IDLE,
            pool_idle_timeout: time::Duration::from_millis(HTTP_POOL_IDLE_TIMEOUT),
            max_redirects: HTTP_MAX_REDIRECTS,
        }
    }
}

fn build_http(env: Lookup) -> HttpConfig {
    let mut http = HttpConfig::default();
    http.timeout = time::Duration::from_millis(
        env_to_uint(env, "HTTP_TIMEOUT_MS", HTTP_TIMEOUT)
    );
    http.connect_timeout = time::Duration::from_millis(
        env_to_uint(env, "HTTP_CONNECT_TIMEOUT_MS", HTTP_CONNECT_TIMEOUT)
    );
    http
}

///
/// Configuration for the sqlite backed document store
///
#[derive(Debug, Clone)]
pub struct PersistenceConfig {
    pub db_url: String,
    pub collection: String
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            db_url: "sqlite:./data/flow_metrics.db".to_string(),
            collection: "artists".to_string()
        }
    }
}

fn build_persistence(env: Lookup) -> PersistenceConfig {
    let default = PersistenceConfig::default();
    PersistenceConfig {
        db_url: env_or(env, "FLOW_DB_URL", &default.db_url),
        collection: env_or(env, "FLOW_COLLECTION", &default.collection)
    }
}

///
/// Thresholds for accepting a cross-provider pairing
///
#[derive(Debug, Clone, Copy)]
pub struct MatchingConfig {
    pub similarity_threshold: f64,  // 0..1 on normalized names
    pub min_provider_score: u32,    // musicbrainz search score, strictly above
    pub max_album_matches: usize,   // albums considered by compare
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self {
            similarity_threshold: 0.85,
            min_provider_score: 70,
            max_album_matches: 10,
        }
    }
}

fn build_matching(env: Lookup) -> MatchingConfig {
    let default = MatchingConfig::default();
    MatchingConfig {
        similarity_threshold: env_to_float(
            env, "MATCH_SIMILARITY_THRESHOLD", default.similarity_threshold
        ),
        min_provider_score: env_to_uint(
            env, "MATCH_MIN_PROVIDER_SCORE", default.min_provider_score as u64
        ) as u32,
        max_album_matches: env_to_uint(
            env, "MATCH_MAX_ALBUMS", default.max_album_matches as u64
        ) as usize,
    }
}

///
/// Configuration for Logger
///

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json
}

#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub filter_directives: String,
    pub format: LogFormat,
    pub with_ansi: bool,
    pub include_file_line: bool,
    pub include_target: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter_directives: "info,flow_metrics=info,sqlx=warn,reqwest=warn".to_string(),
            format: LogFormat::Pretty,
            with_ansi: true,
            include_file_line: false,
            include_target: true,
        }
    }
}

fn build_logging(env: Lookup) -> LoggingConfig {
    let mut logging = LoggingConfig::default();

    // LOG_LEVEL is a bare level, applied to this crate and the root
    if let Some(level) = env_optional(env, "LOG_LEVEL") {
        let level = level.trim().to_ascii_lowercase();
        logging.filter_directives = format!(
            "{level},flow_metrics={level},sqlx=warn,reqwest=warn"
        );
    }
    logging.format = match env_optional(env, "LOG_FORMAT").as_deref() {
        Some(f) if f.eq_ignore_ascii_case("json") => LogFormat::Json,
        _ => LogFormat::Pretty
    };
    logging.with_ansi = env_to_bool(env, "LOG_ANSI", logging.with_ansi);
    logging.include_file_line = env_to_bool(env, "LOG_FILE_LINE", logging.include_file_line);
    logging
}

///
/// AppConfig which holds every section needed to build the clients
///
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub spotify: SpotifyConfig,
    pub musicbrainz: MusicBrainzConfig,
    pub musixmatch: MusixmatchConfig,
    pub scraper: ScraperConfig,
    pub http: HttpConfig,
    pub persistence: PersistenceConfig,
    pub matching: MatchingConfig,
    pub logging: LoggingConfig
}

impl AppConfig {
    pub fn from_lookup(env: Lookup) -> Result<Self, FlowError> {
        Ok( Self {
            spotify: build_spotify(env)?,
            musicbrainz: build_musicbrainz(env)?,
            musixmatch: build_musixmatch(env)?,
            scraper: build_scraper(env),
            http: build_http(env),
            persistence: build_persistence(env),
            matching: build_matching(env),
            logging: build_logging(env)
        })
    }

    /// Requires both Spotify credentials, returned as (id, secret)
    pub fn spotify_credentials(&self) -> Result<(String, String), FlowError> {
        let env = |k: &str| match k {
            "SPOTIFY_CLIENT_ID" => self.spotify.client_id.clone(),
            "SPOTIFY_CLIENT_SECRET" => self.spotify.client_secret.clone(),
            _ => None
        };
        Ok( (env_check(&env, "SPOTIFY_CLIENT_ID")?, env_check(&env, "SPOTIFY_CLIENT_SECRET")?) )
    }
}

pub fn load_config() -> Result<AppConfig, FlowError> {
    dotenvy::dotenv().ok();
    AppConfig::from_lookup(&|key| std::env::var(key).ok())
}
