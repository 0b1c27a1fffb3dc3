//!
//! src/lyrics/sources.rs
//!
//! Lyrics sources as a closed set of strategies. Each source knows how to
//! turn (artist, title) into a page url and how to read lyrics off that
//! page. Page parsing is kept synchronous so parsed documents never live
//! across an await
//!

use std::sync::LazyLock;

use regex::Regex;
use scraper::Html;
use serde::{Deserialize, Serialize};

use crate::errors::LyricsError;

use super::fetcher::PageFetcher;
use super::html::{
    has_class, next_in_document, next_sibling_named, previous_in_document, select_first,
    selector, text_excluding, text_of,
};

pub const AZLYRICS_SEARCH: &str = "https://search.azlyrics.com/search.php";
pub const AZLYRICS_BASE: &str = "https://www.azlyrics.com";
pub const METROLYRICS_BASE: &str = "https://www.metrolyrics.com";
pub const LYRICS_COM_BASE: &str = "https://www.lyrics.com";

static NON_ALNUM: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^a-zA-Z0-9]").expect("static regex"));
static LYRICS_BY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^lyrics by:").expect("static regex"));
static QUOTED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"^"(.*)"$"#).expect("static regex"));
static LYRICS_SUFFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i) lyrics$").expect("static regex"));

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ScrapedLyrics {
    pub artist: String,
    pub title: String,
    pub lyrics: String,
    pub source: String,
    pub url: String,
    #[serde(default)]
    pub album: Option<String>,
    #[serde(default)]
    pub release_date: Option<String>
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LyricsSource {
    AzLyrics,
    MetroLyrics,
    LyricsCom
}

impl LyricsSource {
    /// Fallback order used by song lookups
    pub const ALL: [LyricsSource; 3] = [
        LyricsSource::AzLyrics,
        LyricsSource::MetroLyrics,
        LyricsSource::LyricsCom
    ];

    pub fn key(self) -> &'static str {
        match self {
            LyricsSource::AzLyrics => "azlyrics",
            LyricsSource::MetroLyrics => "metrolyrics",
            LyricsSource::LyricsCom => "lyrics_com"
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            LyricsSource::AzLyrics => "AZLyrics",
            LyricsSource::MetroLyrics => "MetroLyrics",
            LyricsSource::LyricsCom => "Lyrics.com"
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|source| source.key() == key)
    }

    /// Page url for the song, None when the source has no match
    pub async fn search(self, fetcher: &PageFetcher, artist: &str, title: &str) ->
        Result<Option<String>, LyricsError> {
        match self {
            LyricsSource::AzLyrics => {
                let html = fetcher.get(&azlyrics_search_url(artist, Some(title))).await?;
                parse_azlyrics_results(&html, "song results", None)
            }
            LyricsSource::MetroLyrics => {
                let url = metrolyrics_url(artist, title);
                Ok( fetcher.exists(&url).await?.then_some(url) )
            }
            LyricsSource::LyricsCom => {
                let html = fetcher.get(&lyrics_com_search_url(artist, title)).await?;
                parse_lyrics_com_results(&html, artist, title)
            }
        }
    }

    pub async fn fetch(self, fetcher: &PageFetcher, url: &str) ->
        Result<ScrapedLyrics, LyricsError> {
        let html = fetcher.get(url).await?;
        self.parse_page(&html, url)
    }

    pub fn parse_page(self, html: &str, url: &str) -> Result<ScrapedLyrics, LyricsError> {
        match self {
            LyricsSource::AzLyrics => parse_azlyrics_page(html, url),
            LyricsSource::MetroLyrics => parse_metrolyrics_page(html, url),
            LyricsSource::LyricsCom => parse_lyrics_com_page(html, url)
        }
    }
}

fn scraped(source: LyricsSource, artist: String, title: String, lyrics: String, url: &str) ->
    ScrapedLyrics {
    ScrapedLyrics {
        artist,
        title,
        lyrics,
        source: source.label().to_string(),
        url: url.to_string(),
        album: None,
        release_date: None
    }
}

/// search.php?q=artist+title with every non alphanumeric turned into '+'
pub fn azlyrics_search_url(artist: &str, title: Option<&str>) -> String {
    let mut q = NON_ALNUM.replace_all(&artist.to_lowercase(), "+").into_owned();
    if let Some(title) = title {
        q.push('+');
        q.push_str(&NON_ALNUM.replace_all(&title.to_lowercase(), "+"));
    }
    format!("{AZLYRICS_SEARCH}?q={q}")
}

pub fn metrolyrics_url(artist: &str, title: &str) -> String {
    let slug = |s: &str| {
        NON_ALNUM
            .replace_all(&s.to_lowercase(), "-")
            .trim_matches('-')
            .to_string()
    };
    format!("{METROLYRICS_BASE}/{}-lyrics-{}.html", slug(title), slug(artist))
}

pub fn lyrics_com_search_url(artist: &str, title: &str) -> String {
    let terms = format!("{artist} {title}").to_lowercase().replace(' ', "%20");
    format!("{LYRICS_COM_BASE}/lyrics/{terms}")
}

/// Href of a result in the panel whose heading names `section`. With a
/// `must_contain` filter only links whose text contains it qualify
pub fn parse_azlyrics_results(html: &str, section: &str, must_contain: Option<&str>) ->
    Result<Option<String>, LyricsError> {
    let doc = Html::parse_document(html);
    let heading_sel = selector(".panel-heading")?;
    let link_sel = selector("td a")?;
    let needle = must_contain.map(str::to_lowercase);

    for panel in doc.select(&selector(".panel")?) {
        let Some(heading) = panel.select(&heading_sel).next() else {
            continue;
        };
        if !text_of(heading).to_lowercase().contains(section) {
            continue;
        }
        return Ok( panel
            .select(&link_sel)
            .filter(|link| match &needle {
                Some(needle) => text_of(*link).to_lowercase().contains(needle.as_str()),
                None => true
            })
            .find_map(|link| link.value().attr("href").map(str::to_string)) );
    }
    Ok(None)
}

pub fn parse_azlyrics_page(html: &str, url: &str) -> Result<ScrapedLyrics, LyricsError> {
    let doc = Html::parse_document(html);

    let ringtone = select_first(&doc, ".ringtone")?
        .ok_or_else(|| LyricsError::new("Could not find title information"))?;
    let artist_el = select_first(&doc, ".lyricsh h2")?
        .ok_or_else(|| LyricsError::new("Could not find artist information"))?;

    let artist = LYRICS_BY.replace(&text_of(artist_el), "").trim().to_string();

    let title_el = previous_in_document(&doc, ringtone, "b")
        .ok_or_else(|| LyricsError::new("Could not find song title"))?;
    let title = QUOTED.replace(&text_of(title_el), "$1").into_owned();

    let lyrics_el = next_sibling_named(ringtone, "div")
        .ok_or_else(|| LyricsError::new("Could not find lyrics container"))?;
    let lyrics = text_excluding(lyrics_el, &|el| el.value().name() == "script");

    Ok( scraped(LyricsSource::AzLyrics, artist, title, lyrics, url) )
}

pub fn parse_metrolyrics_page(html: &str, url: &str) -> Result<ScrapedLyrics, LyricsError> {
    let doc = Html::parse_document(html);

    let (Some(title_el), Some(artist_el)) =
        (select_first(&doc, "h1.title")?, select_first(&doc, "h2.title")?)
    else {
        return Err(LyricsError::new("Could not find title information"));
    };
    let title = LYRICS_SUFFIX.replace(&text_of(title_el), "").into_owned();
    let artist = text_of(artist_el);

    let verses: Vec<String> = doc.select(&selector(".verse")?).map(text_of).collect();
    if verses.is_empty() {
        return Err(LyricsError::new("Could not find lyrics container"));
    }

    Ok( scraped(LyricsSource::MetroLyrics, artist, title, verses.join("\n\n"), url) )
}

/// First result whose text mentions both artist and title
pub fn parse_lyrics_com_results(html: &str, artist: &str, title: &str) ->
    Result<Option<String>, LyricsError> {
    let doc = Html::parse_document(html);
    let (artist, title) = (artist.to_lowercase(), title.to_lowercase());

    Ok( doc
        .select(&selector(".sec-lyric .lyric-meta-title a")?)
        .filter(|link| {
            let text = text_of(*link).to_lowercase();
            text.contains(&artist) && text.contains(&title)
        })
        .find_map(|link| link.value().attr("href"))
        .map(|href| format!("{LYRICS_COM_BASE}{href}")) )
}

pub fn parse_lyrics_com_page(html: &str, url: &str) -> Result<ScrapedLyrics, LyricsError> {
    let doc = Html::parse_document(html);

    let (Some(title_el), Some(artist_el)) =
        (select_first(&doc, "h1.lyric-title")?, select_first(&doc, "h3.lyric-artist a")?)
    else {
        return Err(LyricsError::new("Could not find title information"));
    };

    let body = select_first(&doc, "#lyric-body-text")?
        .ok_or_else(|| LyricsError::new("Could not find lyrics container"))?;
    let lyrics = text_excluding(body, &|el| {
        matches!(el.value().name(), "script" | "ins")
            || has_class(el, "adx")
            || has_class(el, "rtMatcher")
    });

    Ok( scraped(LyricsSource::LyricsCom, text_of(artist_el), text_of(title_el), lyrics, url) )
}

/// (title, url) pairs from an AZLyrics artist page, album by album
pub fn parse_azlyrics_artist_page(html: &str) -> Result<Vec<(String, String)>, LyricsError> {
    let doc = Html::parse_document(html);
    let link_sel = selector(r#"a[href^="/lyrics/"]"#)?;

    let mut songs = Vec::new();
    for album in doc.select(&selector("div.album")?) {
        let Some(listing) = next_in_document(&doc, album, "div") else {
            continue;
        };
        for link in listing.select(&link_sel) {
            if let Some(href) = link.value().attr("href") {
                songs.push((text_of(link), format!("{AZLYRICS_BASE}{href}")));
            }
        }
    }
    Ok(songs)
}
