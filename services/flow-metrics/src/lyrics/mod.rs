//!
//! src/lyrics/mod.rs
//!
//! Lyrics scraping from public lyrics sites
//!

pub mod fetcher;
pub mod html;
pub mod scraper;
pub mod sources;

pub use fetcher::PageFetcher;
pub use scraper::{LyricsScraper, SongLink, DEFAULT_MAX_SONGS};
pub use sources::{LyricsSource, ScrapedLyrics};
