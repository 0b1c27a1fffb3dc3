//!
//! src/musixmatch/client.rs
//!
//! Musixmatch lyrics metadata client. The api key rides on every request
//! and failures come back inside a 200 response, so the envelope header
//! is checked before the body is read
//!

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;
use url::Url;

use crate::config::{AppConfig, MusixmatchConfig};
use crate::errors::{FlowError, MusixmatchError};
use crate::http::{HttpRequest, ReqwestTransport, Transport};
use crate::paginate::{Page, Paginator};

use super::models::*;

pub const MXM_MAX_PAGE: u32 = 100;

pub struct MusixmatchClient {
    transport: Arc<dyn Transport>,
    base: Url,
    api_key: String
}

impl MusixmatchClient {
    pub fn new(transport: Arc<dyn Transport>, cfg: &MusixmatchConfig, api_key: &str) -> Self {
        Self {
            transport,
            base: cfg.base_url.clone(),
            api_key: api_key.to_string()
        }
    }

    pub fn from_config(app: &AppConfig) -> Result<Self, FlowError> {
        let api_key = app.musixmatch.api_key.clone()
            .ok_or_else(|| FlowError::Config("MUSIXMATCH_API_KEY was not set".to_string()))?;
        let transport = ReqwestTransport::json(&app.http, None)?;
        Ok( Self::new(Arc::new(transport), &app.musixmatch, &api_key) )
    }

    /// GET /ws/1.1/{method}?apikey=...  returning message.body
    async fn request<T: DeserializeOwned>(&self, method: &str, params: &[(&str, String)]) ->
        Result<T, MusixmatchError> {

        let url = self.base
            .join(method)
            .map_err(|e| MusixmatchError::new(format!("bad method {method}: {e}")))?;
        let mut request = HttpRequest::get(url.as_str());
        for (key, value) in params {
            request = request.query(key, value);
        }
        request = request.query("apikey", &self.api_key);

        debug!(method, "musixmatch.request");
        let response = self.transport
            .execute(request)
            .await
            .map_err(|e| MusixmatchError::new(format!("{method}: {e}")))?;
        if !response.is_success() {
            return Err(MusixmatchError::with_status(
                format!("{method}: HTTP {}", response.status), response.status
            ));
        }

        let envelope: Value = response
            .json()
            .map_err(|e| MusixmatchError::new(format!("{method}: invalid response: {e}")))?;
        let status = envelope
            .pointer("/message/header/status_code")
            .and_then(Value::as_u64)
            .unwrap_or(0) as u16;
        if status != 200 {
            let hint = envelope
                .pointer("/message/header/hint")
                .and_then(Value::as_str)
                .filter(|h| !h.is_empty())
                .unwrap_or("no hint");
            return Err(MusixmatchError::with_status(
                format!("{method}: api status {status} ({hint})"), status
            ));
        }

        // empty results come back as [] instead of an object
        let body = match envelope.pointer("/message/body") {
            Some(body) if body.is_object() => body.clone(),
            _ => Value::Object(Default::default())
        };
        serde_json::from_value(body)
            .map_err(|e| MusixmatchError::new(format!("{method}: invalid body: {e}")))
    }

    /// artist.search
    pub async fn search_artist(&self, artist: &str, page: u32, page_size: u32) ->
        Result<Vec<MxmArtist>, MusixmatchError> {
        let body: ArtistListBody = self.request("artist.search", &[
            ("q_artist", artist.to_string()),
            ("page", page.to_string()),
            ("page_size", page_size.min(MXM_MAX_PAGE).to_string())
        ]).await?;
        Ok( body.artist_list.into_iter().map(|entry| entry.artist).collect() )
    }

    /// track.search ordered by track rating
    pub async fn search_tracks(
        &self,
        query: Option<&str>,
        artist: Option<&str>,
        track: Option<&str>,
        page: u32,
        page_size: u32
    ) -> Result<Vec<MxmTrack>, MusixmatchError> {
        let mut params = vec![
            ("page", page.to_string()),
            ("page_size", page_size.min(MXM_MAX_PAGE).to_string()),
            ("s_track_rating", "desc".to_string())
        ];
        for (key, value) in [("q", query), ("q_artist", artist), ("q_track", track)] {
            if let Some(value) = value {
                params.push((key, value.to_string()));
            }
        }
        let body: TrackListBody = self.request("track.search", &params).await?;
        Ok( body.track_list.into_iter().map(|entry| entry.track).collect() )
    }

    /// track.search filtered to one artist id
    pub async fn get_artist_tracks(&self, artist_id: u64, page: u32, page_size: u32) ->
        Result<Vec<MxmTrack>, MusixmatchError> {
        let body: TrackListBody = self.request("track.search", &[
            ("f_artist_id", artist_id.to_string()),
            ("page", page.to_string()),
            ("page_size", page_size.min(MXM_MAX_PAGE).to_string()),
            ("s_track_rating", "desc".to_string())
        ]).await?;
        Ok( body.track_list.into_iter().map(|entry| entry.track).collect() )
    }

    /// track.lyrics.get
    pub async fn get_track_lyrics(&self, track_id: u64) -> Result<MxmLyrics, MusixmatchError> {
        let body: LyricsBody = self
            .request("track.lyrics.get", &[("track_id", track_id.to_string())])
            .await?;
        Ok(body.lyrics)
    }

    /// Up to `limit` tracks by the artist, best rated first
    pub async fn get_all_artist_tracks(&self, artist_id: u64, limit: usize) ->
        Result<Vec<MxmTrack>, MusixmatchError> {
        let page_size = (limit as u32).clamp(1, MXM_MAX_PAGE);
        Paginator::new(page_size)
            .with_max_items(limit)
            .collect(|req| async move {
                let tracks = self
                    .get_artist_tracks(artist_id, req.page_number(), req.limit)
                    .await?;
                Ok::<_, MusixmatchError>(Page::sized(tracks, req.limit))
            })
            .await
    }
}
