//!
//! src/lyrics/scraper.rs
//!
//! Song and artist lyrics lookups. Songs fall back through the sources in
//! order and only fail when every source has failed
//!

use tracing::{debug, info, warn};

use crate::config::AppConfig;
use crate::errors::{FlowError, LyricsError};

use super::fetcher::PageFetcher;
use super::sources::{
    azlyrics_search_url, parse_azlyrics_artist_page, parse_azlyrics_results, LyricsSource,
    ScrapedLyrics,
};

pub const DEFAULT_MAX_SONGS: usize = 5;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SongLink {
    pub title: String,
    pub url: String
}

pub struct LyricsScraper {
    fetcher: PageFetcher,
    sources: Vec<LyricsSource>
}

impl LyricsScraper {
    pub fn new(fetcher: PageFetcher) -> Self {
        Self { fetcher, sources: LyricsSource::ALL.to_vec() }
    }

    pub fn from_config(app: &AppConfig) -> Result<Self, FlowError> {
        Ok( Self::new(PageFetcher::from_config(app)?) )
    }

    /// Restrict lookups to the given sources, tried in the given order
    pub fn with_sources(mut self, sources: Vec<LyricsSource>) -> Self {
        self.sources = sources;
        self
    }

    async fn try_source(&self, source: LyricsSource, artist: &str, title: &str) ->
        Result<ScrapedLyrics, LyricsError> {
        let url = source
            .search(&self.fetcher, artist, title)
            .await?
            .ok_or_else(|| LyricsError::new("no search results"))?;
        source.fetch(&self.fetcher, &url).await
    }

    pub async fn get_song_lyrics(&self, artist: &str, title: &str) ->
        Result<ScrapedLyrics, LyricsError> {
        let mut failures = Vec::new();

        for &source in &self.sources {
            match self.try_source(source, artist, title).await {
                Ok(lyrics) => {
                    info!(source = source.label(), artist, title, "lyrics.found");
                    return Ok(lyrics);
                }
                Err(e) => {
                    debug!(source = source.label(), error = %e, "lyrics.source_failed");
                    failures.push(format!("{}: {}", source.label(), e.message));
                }
            }
        }

        Err(LyricsError::new(format!(
            "Could not find lyrics for {artist} - {title} in any source: {}",
            failures.join("; ")
        )))
    }

    async fn artist_songs(&self, artist: &str) -> Result<Vec<SongLink>, LyricsError> {
        let search = self.fetcher.get(&azlyrics_search_url(artist, None)).await?;
        let Some(artist_url) = parse_azlyrics_results(&search, "artist results", Some(artist))? else {
            return Ok(Vec::new());
        };

        let page = self.fetcher.get(&artist_url).await?;
        Ok( parse_azlyrics_artist_page(&page)?
            .into_iter()
            .map(|(title, url)| SongLink { title, url })
            .collect() )
    }

    /// Every song listed on the artist's AZLyrics page, empty when the
    /// artist can't be found
    pub async fn search_artist_songs(&self, artist: &str) -> Result<Vec<SongLink>, LyricsError> {
        self.artist_songs(artist)
            .await
            .map_err(|e| LyricsError::new(format!("Failed to search artist songs: {}", e.message)))
    }

    /// Lyrics for up to `max_songs` of the artist's songs. Songs that fail
    /// to fetch are skipped
    pub async fn get_artist_lyrics(&self, artist: &str, max_songs: usize) ->
        Result<Vec<ScrapedLyrics>, LyricsError> {
        let songs = self.search_artist_songs(artist).await?;
        if songs.is_empty() {
            return Err(LyricsError::new(format!("Could not find songs for artist {artist}")));
        }

        let mut found = Vec::new();
        for song in songs.into_iter().take(max_songs) {
            match LyricsSource::AzLyrics.fetch(&self.fetcher, &song.url).await {
                Ok(lyrics) => found.push(lyrics),
                Err(e) => warn!(title = %song.title, error = %e, "lyrics.song_skipped")
            }
        }
        Ok(found)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ScraperConfig;
    use crate::test_utils::FakeTransport;
    use std::sync::Arc;
    use std::time::Duration;

    fn scraper(fake: FakeTransport) -> (LyricsScraper, Arc<FakeTransport>) {
        let cfg = ScraperConfig {
            min_interval: Duration::ZERO,
            jitter_min: Duration::ZERO,
            jitter_max: Duration::ZERO,
            timeout: Duration::from_secs(1)
        };
        let fake = Arc::new(fake);
        (LyricsScraper::new(PageFetcher::new(fake.clone(), &cfg)), fake)
    }

    fn az_song(title: &str, line: &str) -> String {
        format!(r#"<div class="lyricsh"><h2>Nas Lyrics</h2></div><b>"{title}"</b>
            <div class="ringtone"></div><div>{line}</div>"#)
    }

    const LYRICS_COM_SEARCH: &str = r#"<div class="sec-lyric"><p class="lyric-meta-title">
        <a href="/lyric/2/Nas/One+Mic">One Mic by Nas</a></p></div>"#;

    const LYRICS_COM_PAGE: &str = r#"<h1 class="lyric-title">One Mic</h1>
        <h3 class="lyric-artist"><a href="/artist/Nas">Nas</a></h3>
        <pre id="lyric-body-text">All I need is one mic</pre>"#;

    #[tokio::test]
    async fn falls_back_until_a_source_answers() -> Result<(), LyricsError> {
        // azlyrics search is empty, metrolyrics has no page
        let (scraper, fake) = scraper(FakeTransport::new()
            .on("search.php?q=nas+one+mic", "<html></html>")
            .on_status("one-mic-lyrics-nas.html", 404)
            .on("/lyrics/nas%20one%20mic", LYRICS_COM_SEARCH)
            .on("/lyric/2/Nas/One+Mic", LYRICS_COM_PAGE));

        let lyrics = scraper.get_song_lyrics("Nas", "One Mic").await?;
        assert_eq!(lyrics.source, "Lyrics.com");
        assert_eq!(lyrics.lyrics, "All I need is one mic");
        assert_eq!(lyrics.url, "https://www.lyrics.com/lyric/2/Nas/One+Mic");
        assert_eq!(fake.requests().len(), 4);
        Ok(())
    }

    #[tokio::test]
    async fn first_source_wins() -> Result<(), LyricsError> {
        let search = r#"<div class="panel"><div class="panel-heading">Song results:</div>
            <table><tr><td><a href="https://www.azlyrics.com/lyrics/nas/onemic.html">One Mic</a></td></tr></table></div>"#;
        let (scraper, fake) = scraper(FakeTransport::new()
            .on("search.php?q=nas+one+mic", search)
            .on("/lyrics/nas/onemic.html", &az_song("One Mic", "All I need is one mic")));

        let lyrics = scraper.get_song_lyrics("Nas", "One Mic").await?;
        assert_eq!(lyrics.source, "AZLyrics");
        assert_eq!(lyrics.title, "One Mic");
        assert_eq!(fake.requests().len(), 2);
        Ok(())
    }

    #[tokio::test]
    async fn all_sources_failing_lists_each_failure() {
        let (scraper, _) = scraper(FakeTransport::new());
        let err = match scraper.get_song_lyrics("Nobody", "Nothing").await {
            Ok(found) => panic!("unexpected lyrics {found:?}"),
            Err(e) => e.message
        };

        assert!(err.starts_with("Could not find lyrics for Nobody - Nothing in any source: "));
        assert!(err.contains("AZLyrics: Request failed: HTTP 404"));
        assert!(err.contains("MetroLyrics: no search results"));
        assert!(err.contains("Lyrics.com: Request failed: HTTP 404"));
    }

    #[tokio::test]
    async fn artist_lyrics_skip_broken_songs_and_cap_count() -> Result<(), LyricsError> {
        let search = r#"<div class="panel"><div class="panel-heading">Artist results:</div>
            <table><tr><td><a href="https://www.azlyrics.com/n/nas.html">Nas</a></td></tr></table></div>"#;
        let artist = r#"<div class="album">album: "Illmatic"</div>
            <div><a href="/lyrics/nas/one.html">One</a><a href="/lyrics/nas/two.html">Two</a>
                 <a href="/lyrics/nas/three.html">Three</a></div>"#;
        let (scraper, fake) = scraper(FakeTransport::new()
            .on("search.php?q=nas", search)
            .on("/n/nas.html", artist)
            .on("/lyrics/nas/one.html", &az_song("One", "first"))
            .on("/lyrics/nas/two.html", "<html>no lyrics here</html>")
            .on("/lyrics/nas/three.html", &az_song("Three", "third")));

        let songs = scraper.search_artist_songs("Nas").await?;
        assert_eq!(songs.len(), 3);
        assert_eq!(songs[1], SongLink {
            title: "Two".to_string(),
            url: "https://www.azlyrics.com/lyrics/nas/two.html".to_string()
        });

        let lyrics = scraper.get_artist_lyrics("Nas", 2).await?;
        let titles: Vec<&str> = lyrics.iter().map(|l| l.title.as_str()).collect();
        assert_eq!(titles, vec!["One"]);
        assert_eq!(fake.count("/lyrics/nas/three.html"), 0);
        Ok(())
    }

    #[tokio::test]
    async fn unknown_artist_has_no_songs() {
        let (scraper, _) = scraper(FakeTransport::new().on("search.php?q=nobody", "<html></html>"));
        let err = scraper.get_artist_lyrics("Nobody", DEFAULT_MAX_SONGS).await.err();
        assert_eq!(err, Some(LyricsError::new("Could not find songs for artist Nobody")));
    }

    #[tokio::test]
    async fn live_lyrics_testbench() -> Result<(), FlowError> {
        dotenvy::dotenv().ok();
        if std::env::var("LIVE_HTTP").ok().as_deref() != Some("1") {
            return Ok(());
        }

        let app = crate::config::load_config()?;
        let scraper = LyricsScraper::from_config(&app)?;
        match scraper.get_song_lyrics("Kendrick Lamar", "HUMBLE.").await {
            Ok(lyrics) => {
                assert!(!lyrics.lyrics.is_empty());
                println!("found on {}: {}", lyrics.source, lyrics.url);
            }
            Err(e) => println!("no source answered: {e}")
        }
        Ok(())
    }
}
