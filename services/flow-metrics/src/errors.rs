//!
//! src/errors.rs 
//!
//! Defines the per-provider error kinds and the application error 
//! that batch drivers and the binary report through 
//!

use thiserror::Error; 

/// Any Spotify failure: transport, non-2xx status, or an unparseable body 
#[derive(Error, Debug, Clone, PartialEq)]
#[error("spotify error: {message}")]
pub struct SpotifyError {
    pub message: String, 
    pub status_code: Option<u16>
}

impl SpotifyError {
    pub fn new(message: impl Into<String>) -> Self {
        Self { message: message.into(), status_code: None }
    }

    pub fn with_status(message: impl Into<String>, status: u16) -> Self {
        Self { message: message.into(), status_code: Some(status) }
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
#[error("musicbrainz error: {message}")]
pub struct MusicBrainzError {
    pub message: String, 
    pub status_code: Option<u16>
}

impl MusicBrainzError {
    pub fn new(message: impl Into<String>) -> Self {
        Self { message: message.into(), status_code: None }
    }

    pub fn with_status(message: impl Into<String>, status: u16) -> Self {
        Self { message: message.into(), status_code: Some(status) }
    }
}

/// Musixmatch also reports failures inside a 200 envelope, 
/// those carry the envelope's status code 
#[derive(Error, Debug, Clone, PartialEq)]
#[error("musixmatch error: {message}")]
pub struct MusixmatchError {
    pub message: String, 
    pub status_code: Option<u16>
}

impl MusixmatchError {
    pub fn new(message: impl Into<String>) -> Self {
        Self { message: message.into(), status_code: None }
    }

    pub fn with_status(message: impl Into<String>, status: u16) -> Self {
        Self { message: message.into(), status_code: Some(status) }
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
#[error("lyrics error: {message}")]
pub struct LyricsError {
    pub message: String
}

impl LyricsError {
    pub fn new(message: impl Into<String>) -> Self {
        Self { message: message.into() }
    }
}

#[derive(Error, Debug)]
pub enum FlowError {
    #[error("config error: {0}")]
    Config(String),
    #[error("http error: {0}")]
    Http(String),
    #[error("parse error: {0}")]
    Parse(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("db error: {0}")]
    Db(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error), 
    #[error(transparent)]
    Spotify(#[from] SpotifyError),
    #[error(transparent)]
    MusicBrainz(#[from] MusicBrainzError),
    #[error(transparent)]
    Musixmatch(#[from] MusixmatchError),
    #[error(transparent)]
    Lyrics(#[from] LyricsError)
}

impl FlowError {
    /// True for failures reported by an upstream provider rather than by
    /// local config, storage or io. The driver tags its final error with it
    pub fn is_provider(&self) -> bool {
        matches!(
            self,
            FlowError::Spotify(_) | FlowError::MusicBrainz(_) 
                | FlowError::Musixmatch(_) | FlowError::Lyrics(_)
        )
    }
}

impl From<reqwest::Error> for FlowError {
    fn from(e: reqwest::Error) -> Self { FlowError::Http(e.to_string()) }
}

impl From<serde_json::Error> for FlowError {
    fn from(e: serde_json::Error) -> Self { FlowError::Parse(e.to_string()) }
}

impl From<sqlx::Error> for FlowError {
    fn from(e: sqlx::Error) -> Self { FlowError::Db(e.to_string()) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_errors_carry_status() {
        let e = SpotifyError::with_status("GET artists/x: HTTP 404", 404);
        assert_eq!(e.status_code, Some(404));
        assert_eq!(e.to_string(), "spotify error: GET artists/x: HTTP 404");

        let flow: FlowError = e.into();
        assert!(flow.is_provider());
        assert!(!FlowError::Db("locked".into()).is_provider());
    }
}
