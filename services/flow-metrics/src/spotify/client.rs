//!
//! src/spotify/client.rs
//!
//! Spotify Web API client using the client credentials flow. The access
//! token is cached with its expiry and exchanged again only once expired
//!

use std::sync::Arc;

use chrono::Utc;
use serde::de::DeserializeOwned;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::config::{AppConfig, SpotifyConfig};
use crate::errors::{FlowError, SpotifyError};
use crate::http::{HttpRequest, ReqwestTransport, Transport};
use crate::paginate::{Page, Paginator};
use crate::timeline::{build_timeline, DateOrder, Timeline};

use super::models::*;

/// Spotify caps every listing endpoint at 50 items per page
pub const SPOTIFY_MAX_PAGE: u32 = 50;

pub struct SpotifyClient {
    transport: Arc<dyn Transport>,
    cfg: SpotifyConfig,
    client_id: String,
    client_secret: String,
    token: Mutex<Option<SpotifyToken>>
}

impl SpotifyClient {
    pub fn new(
        transport: Arc<dyn Transport>,
        cfg: &SpotifyConfig,
        client_id: &str,
        client_secret: &str
    ) -> Self {
        Self {
            transport,
            cfg: cfg.clone(),
            client_id: client_id.to_string(),
            client_secret: client_secret.to_string(),
            token: Mutex::new(None)
        }
    }

    pub fn from_config(app: &AppConfig) -> Result<Self, FlowError> {
        let (client_id, client_secret) = app.spotify_credentials()?;
        let transport = ReqwestTransport::json(&app.http, None)?;
        Ok( Self::new(Arc::new(transport), &app.spotify, &client_id, &client_secret) )
    }

    pub fn market(&self) -> &str { &self.cfg.market }

    /// POST token_url grant_type=client_credentials
    async fn authenticate(&self) -> Result<SpotifyToken, SpotifyError> {
        let request = HttpRequest::post(self.cfg.token_url.as_str())
            .form("grant_type", "client_credentials")
            .basic_auth(&self.client_id, &self.client_secret);

        let token: SpotifyToken = self.send(request, "token exchange").await?;
        debug!(expires_in = token.expires_in, "spotify.token.issued");
        token.issued_at(Utc::now())
    }

    /// Returns the cached bearer or exchanges credentials for a new one
    async fn access_token(&self) -> Result<String, SpotifyError> {
        let mut cached = self.token.lock().await;
        match cached.as_ref() {
            Some(token) if token.is_valid_at(Utc::now()) => Ok(token.access_token.clone()),
            _ => {
                let token = self.authenticate().await?;
                let bearer = token.access_token.clone();
                *cached = Some(token);
                Ok(bearer)
            }
        }
    }

    async fn send<T: DeserializeOwned>(&self, request: HttpRequest, context: &str) ->
        Result<T, SpotifyError> {

        debug!(url = %request.url, "spotify.request");
        let response = self.transport
            .execute(request)
            .await
            .map_err(|e| SpotifyError::new(format!("{context}: {e}")))?;

        if !response.is_success() {
            // error bodies look like {"error": {"status": 404, "message": "..."}}
            let detail = serde_json::from_str::<serde_json::Value>(&response.body)
                .ok()
                .and_then(|v| {
                    v.pointer("/error/message")
                        .or_else(|| v.pointer("/error_description"))
                        .and_then(|m| m.as_str())
                        .map(str::to_string)
                })
                .unwrap_or_else(|| format!("HTTP {}", response.status));
            return Err(SpotifyError::with_status(
                format!("{context}: {detail}"), response.status
            ));
        }

        response
            .json()
            .map_err(|e| SpotifyError::new(format!("{context}: invalid response: {e}")))
    }

    async fn api_get<T: DeserializeOwned>(&self, endpoint: &str, query: &[(&str, String)]) ->
        Result<T, SpotifyError> {

        let bearer = self.access_token().await?;
        let url = self.cfg.api_base
            .join(endpoint)
            .map_err(|e| SpotifyError::new(format!("bad endpoint {endpoint}: {e}")))?;

        let mut request = HttpRequest::get(url.as_str()).bearer(&bearer);
        for (key, value) in query {
            request = request.query(key, value);
        }
        self.send(request, &format!("GET {endpoint}")).await
    }

    /// GET /v1/search?type=artist&q=...&limit=&offset=
    pub async fn search_artists(&self, query: &str, limit: u32, offset: u32) ->
        Result<Vec<SpotifyArtist>, SpotifyError> {
        let found: ArtistSearch = self.api_get("search", &[
            ("q", query.to_string()),
            ("type", "artist".to_string()),
            ("limit", limit.min(SPOTIFY_MAX_PAGE).to_string()),
            ("offset", offset.to_string())
        ]).await?;
        Ok(found.artists.items)
    }

    /// GET /v1/artists/{id}
    pub async fn get_artist(&self, artist_id: &str) -> Result<SpotifyArtist, SpotifyError> {
        self.api_get(&format!("artists/{artist_id}"), &[]).await
    }

    /// GET /v1/artists/{id}/albums?include_groups=&limit=&offset=&market=
    pub async fn get_artist_albums(
        &self,
        artist_id: &str,
        album_types: &[AlbumType],
        limit: u32,
        offset: u32,
        market: Option<&str>
    ) -> Result<Paging<SpotifyAlbum>, SpotifyError> {
        let mut query = vec![
            ("limit", limit.min(SPOTIFY_MAX_PAGE).to_string()),
            ("offset", offset.to_string())
        ];
        if !album_types.is_empty() {
            let groups: Vec<&str> = album_types.iter().map(|t| t.as_str()).collect();
            query.push(("include_groups", groups.join(",")));
        }
        if let Some(market) = market {
            query.push(("market", market.to_string()));
        }
        self.api_get(&format!("artists/{artist_id}/albums"), &query).await
    }

    /// GET /v1/albums/{id}
    pub async fn get_album(&self, album_id: &str) -> Result<SpotifyAlbum, SpotifyError> {
        self.api_get(&format!("albums/{album_id}"), &[]).await
    }

    /// GET /v1/albums/{id}/tracks?limit=&offset=
    pub async fn get_album_tracks(&self, album_id: &str, limit: u32, offset: u32) ->
        Result<Paging<SpotifyTrack>, SpotifyError> {
        self.api_get(&format!("albums/{album_id}/tracks"), &[
            ("limit", limit.min(SPOTIFY_MAX_PAGE).to_string()),
            ("offset", offset.to_string())
        ]).await
    }

    /// GET /v1/tracks/{id}
    pub async fn get_track(&self, track_id: &str) -> Result<SpotifyTrack, SpotifyError> {
        self.api_get(&format!("tracks/{track_id}"), &[]).await
    }

    /// GET /v1/artists/{id}/top-tracks?market=
    pub async fn get_artist_top_tracks(&self, artist_id: &str, market: Option<&str>) ->
        Result<Vec<SpotifyTrack>, SpotifyError> {
        let market = market.unwrap_or(&self.cfg.market).to_string();
        let top: TopTracks = self
            .api_get(&format!("artists/{artist_id}/top-tracks"), &[("market", market)])
            .await?;
        Ok(top.tracks)
    }

    /// GET /v1/artists/{id}/related-artists
    pub async fn get_related_artists(&self, artist_id: &str) ->
        Result<Vec<SpotifyArtist>, SpotifyError> {
        let related: RelatedArtists = self
            .api_get(&format!("artists/{artist_id}/related-artists"), &[])
            .await?;
        Ok(related.artists)
    }

    /// Every album of the given types (all types when empty)
    pub async fn get_all_artist_albums(&self, artist_id: &str, album_types: &[AlbumType]) ->
        Result<Vec<SpotifyAlbum>, SpotifyError> {
        Paginator::new(SPOTIFY_MAX_PAGE)
            .collect(|req| async move {
                let page = self
                    .get_artist_albums(artist_id, album_types, req.limit, req.offset, None)
                    .await?;
                Ok::<_, SpotifyError>(Page::linked(page.items, page.next.as_deref()))
            })
            .await
    }

    /// Every track of an album as a full track object. A track whose full
    /// lookup fails is kept in its simplified form
    pub async fn get_all_album_tracks(&self, album_id: &str) ->
        Result<Vec<SpotifyTrack>, SpotifyError> {
        let simplified = Paginator::new(SPOTIFY_MAX_PAGE)
            .collect(|req| async move {
                let page = self.get_album_tracks(album_id, req.limit, req.offset).await?;
                Ok::<_, SpotifyError>(Page::linked(page.items, page.next.as_deref()))
            })
            .await?;

        let mut tracks = Vec::with_capacity(simplified.len());
        for track in simplified {
            match self.get_track(&track.id).await {
                Ok(full) => tracks.push(full),
                Err(e) => {
                    warn!(error = %e, track_id = %track.id, "spotify.track.fallback_simplified");
                    tracks.push(track);
                }
            }
        }
        Ok(tracks)
    }

    /// Every track across the artist's albums and singles
    pub async fn get_artist_all_tracks(&self, artist_id: &str) ->
        Result<Vec<SpotifyTrack>, SpotifyError> {
        let albums = self
            .get_all_artist_albums(artist_id, &[AlbumType::Album, AlbumType::Single])
            .await?;

        let mut tracks = Vec::new();
        for album in &albums {
            tracks.extend(self.get_all_album_tracks(&album.id).await?);
        }
        Ok(tracks)
    }

    /// Albums grouped by release year, newest first inside each year
    pub async fn get_artist_timeline(&self, artist_id: &str) ->
        Result<Timeline<SpotifyAlbum>, SpotifyError> {
        let albums = self.get_all_artist_albums(artist_id, &[]).await?;
        Ok( build_timeline(albums, |a| Some(a.release_date.as_str()), DateOrder::Descending) )
    }

    pub async fn get_artist_stats(&self, artist_id: &str, market: Option<&str>) ->
        Result<ArtistStats, SpotifyError> {
        let artist = self.get_artist(artist_id).await?;
        let albums = self.get_all_artist_albums(artist_id, &[]).await?;
        let album_counts = AlbumCounts::tally(albums.iter().map(album_kind));
        let top_tracks = self.get_artist_top_tracks(artist_id, market).await?;
        let average_track_popularity = average_popularity(&top_tracks);

        Ok( ArtistStats {
            album_counts,
            average_track_popularity,
            genres: artist.genres.clone(),
            followers: artist.follower_count(),
            popularity: artist.popularity,
            top_tracks,
            artist
        })
    }
}

/// Spotify reports features on other artists' releases through album_group
pub fn album_kind(album: &SpotifyAlbum) -> &str {
    match album.album_group.as_deref() {
        Some("appears_on") => "appears_on",
        _ => album.album_type.as_str()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use crate::http::{HttpResponse, Method};
    use crate::test_utils::{FakeTransport, MockTransport};

    const TOKEN: &str = r#"{"access_token":"tok","token_type":"Bearer","expires_in":3600}"#;

    fn config() -> SpotifyConfig {
        match AppConfig::from_lookup(&|_| None) {
            Ok(cfg) => cfg.spotify,
            Err(e) => panic!("default config: {e}")
        }
    }

    fn client(fake: FakeTransport) -> (SpotifyClient, Arc<FakeTransport>) {
        let fake = Arc::new(fake.on("api/token", TOKEN));
        let client = SpotifyClient::new(fake.clone(), &config(), "id", "secret");
        (client, fake)
    }

    fn album(id: &str, album_type: &str, date: &str) -> String {
        format!(
            r#"{{"id":"{id}","name":"{id}","album_type":"{album_type}","release_date":"{date}","total_tracks":10}}"#
        )
    }

    #[tokio::test]
    async fn token_is_cached_until_expiry() -> Result<(), SpotifyError> {
        let mut mock = MockTransport::new();
        mock.expect_execute()
            .withf(|req| req.method == Method::Post)
            .times(1)
            .returning(|_| Ok(HttpResponse::ok(TOKEN)));
        mock.expect_execute()
            .withf(|req| req.method == Method::Get && req.bearer.as_deref() == Some("tok"))
            .times(2)
            .returning(|_| Ok(HttpResponse::ok(r#"{"id":"a1","name":"Nas"}"#)));

        let client = SpotifyClient::new(Arc::new(mock), &config(), "id", "secret");
        client.get_artist("a1").await?;
        let artist = client.get_artist("a1").await?;
        assert_eq!(artist.name, "Nas");
        Ok(())
    }

    #[tokio::test]
    async fn expired_token_triggers_new_exchange() -> Result<(), SpotifyError> {
        let fake = Arc::new(
            FakeTransport::new()
                .on("api/token", r#"{"access_token":"tok","expires_in":0}"#)
                .on("artists/a1", r#"{"id":"a1","name":"Nas"}"#)
        );
        let client = SpotifyClient::new(fake.clone(), &config(), "id", "secret");
        client.get_artist("a1").await?;
        client.get_artist("a1").await?;
        assert_eq!(fake.count("api/token"), 2);
        Ok(())
    }

    #[tokio::test]
    async fn huge_token_lifetime_is_a_provider_error() {
        let fake = FakeTransport::new()
            .on("api/token", r#"{"access_token":"tok","expires_in":9223372036854775807}"#)
            .on("artists/a1", r#"{"id":"a1","name":"Nas"}"#);
        let client = SpotifyClient::new(Arc::new(fake), &config(), "id", "secret");

        let err = client.get_artist("a1").await.err();
        assert!(err.is_some_and(|e| e.message.contains("expires_in out of range")));
    }

    #[tokio::test]
    async fn token_request_uses_client_credentials() -> Result<(), SpotifyError> {
        let (client, fake) = client(
            FakeTransport::new().on("artists/a1", r#"{"id":"a1","name":"Nas"}"#)
        );
        client.get_artist("a1").await?;

        let token_req = &fake.requests()[0];
        assert_eq!(token_req.method, Method::Post);
        assert_eq!(token_req.form, vec![("grant_type".to_string(), "client_credentials".to_string())]);
        assert_eq!(token_req.basic_auth, Some(("id".to_string(), "secret".to_string())));
        Ok(())
    }

    #[tokio::test]
    async fn http_errors_carry_status_and_message() {
        let (client, _) = client(FakeTransport::new().route(|req| {
            req.url.ends_with("artists/missing").then(|| Ok(HttpResponse::new(
                404, r#"{"error":{"status":404,"message":"non existing id"}}"#
            )))
        }));

        let err = client.get_artist("missing").await.err();
        assert_eq!(
            err,
            Some(SpotifyError::with_status("GET artists/missing: non existing id", 404))
        );
    }

    #[tokio::test]
    async fn malformed_body_is_a_provider_error() {
        let (client, _) = client(FakeTransport::new().on("artists/a1", "<html>"));
        let err = client.get_artist("a1").await.err();
        assert!(err.is_some_and(|e| e.status_code.is_none() && e.message.contains("invalid response")));
    }

    #[tokio::test]
    async fn search_caps_limit_at_fifty() -> Result<(), SpotifyError> {
        let (client, fake) = client(FakeTransport::new().on(
            "v1/search",
            r#"{"artists":{"items":[{"id":"a1","name":"Nas"}],"next":null}}"#
        ));
        let found = client.search_artists("nas", 200, 0).await?;
        assert_eq!(found.len(), 1);

        let search = fake.requests().into_iter().find(|r| r.url.ends_with("search"));
        assert_eq!(search.as_ref().and_then(|r| r.query_value("limit")), Some("50"));
        assert_eq!(search.as_ref().and_then(|r| r.query_value("type")), Some("artist"));
        Ok(())
    }

    #[tokio::test]
    async fn all_albums_follow_next_links() -> Result<(), SpotifyError> {
        let page_one = format!(
            r#"{{"items":[{},{}],"next":"https://api.spotify.com/v1/artists/a1/albums?offset=50"}}"#,
            album("x1", "album", "1994-04-19"), album("x2", "single", "1994-10-01")
        );
        let page_two = format!(r#"{{"items":[{}],"next":null}}"#, album("x3", "album", "1996-07-02"));

        let (client, fake) = client(FakeTransport::new().route(move |req| {
            if !req.url.ends_with("artists/a1/albums") {
                return None;
            }
            let body = match req.query_value("offset") {
                Some("0") => page_one.clone(),
                _ => page_two.clone()
            };
            Some(Ok(HttpResponse::ok(body)))
        }));

        let albums = client.get_all_artist_albums("a1", &[AlbumType::Album]).await?;
        let ids: Vec<&str> = albums.iter().map(|a| a.id.as_str()).collect();
        assert_eq!(ids, vec!["x1", "x2", "x3"]);
        assert_eq!(fake.count("artists/a1/albums"), 2);

        let first = fake.requests().into_iter().find(|r| r.url.ends_with("albums"));
        assert_eq!(first.as_ref().and_then(|r| r.query_value("include_groups")), Some("album"));
        Ok(())
    }

    #[tokio::test]
    async fn timeline_sorts_newest_first_within_year() -> Result<(), SpotifyError> {
        let body = format!(
            r#"{{"items":[{},{},{}],"next":null}}"#,
            album("early", "album", "1994-04-19"),
            album("late", "single", "1994-10-01"),
            album("old", "album", "1991-01-01")
        );
        let (client, _) = client(FakeTransport::new().on("artists/a1/albums", &body));

        let timeline = client.get_artist_timeline("a1").await?;
        let years: Vec<&String> = timeline.keys().collect();
        assert_eq!(years, vec!["1991", "1994"]);
        let names: Vec<&str> = timeline["1994"].iter().map(|a| a.id.as_str()).collect();
        assert_eq!(names, vec!["late", "early"]);
        Ok(())
    }

    #[tokio::test]
    async fn album_tracks_fall_back_to_simplified() -> Result<(), SpotifyError> {
        let (client, _) = client(
            FakeTransport::new()
                .on(
                    "albums/al1/tracks",
                    r#"{"items":[{"id":"t1","name":"One"},{"id":"t2","name":"Two"}],"next":null}"#
                )
                .on("tracks/t1", r#"{"id":"t1","name":"One","popularity":70}"#)
                .on_status("tracks/t2", 502)
        );

        let tracks = client.get_all_album_tracks("al1").await?;
        assert_eq!(tracks.len(), 2);
        assert_eq!(tracks[0].popularity, Some(70));
        assert_eq!(tracks[1].name, "Two");
        assert!(tracks[1].popularity.is_none());
        Ok(())
    }

    #[tokio::test]
    async fn stats_tally_albums_and_average_popularity() -> Result<(), SpotifyError> {
        let albums = format!(
            r#"{{"items":[{},{},{},{}],"next":null}}"#,
            album("a", "album", "2012-10-22"),
            album("b", "single", "2015-03-15"),
            album("c", "compilation", "2016-03-04"),
            r#"{"id":"d","name":"d","album_type":"album","album_group":"appears_on","release_date":"2017"}"#
        );
        let (client, fake) = client(
            FakeTransport::new()
                .on("artists/k1", r#"{"id":"k1","name":"Kendrick Lamar","genres":["hip hop"],"followers":{"total":1000},"popularity":90}"#)
                .on("artists/k1/albums", &albums)
                .on("artists/k1/top-tracks", r#"{"tracks":[{"id":"t1","name":"A","popularity":90},{"id":"t2","name":"B"}]}"#)
        );

        let stats = client.get_artist_stats("k1", None).await?;
        assert_eq!(stats.album_counts, AlbumCounts {
            album: 1, single: 1, compilation: 1, appears_on: 1, total: 4
        });
        assert_eq!(stats.average_track_popularity, 45.0);
        assert_eq!(stats.followers, 1000);
        assert_eq!(stats.genres, vec!["hip hop".to_string()]);

        let top = fake.requests().into_iter().find(|r| r.url.ends_with("top-tracks"));
        assert_eq!(top.as_ref().and_then(|r| r.query_value("market")), Some("US"));
        Ok(())
    }

    #[tokio::test]
    async fn related_artists_unwrap_the_envelope() -> Result<(), SpotifyError> {
        let (client, fake) = client(FakeTransport::new().on(
            "artists/a1/related-artists",
            r#"{"artists":[{"id":"r1","name":"AZ"},{"id":"r2","name":"Mobb Deep"}]}"#
        ));

        let related = client.get_related_artists("a1").await?;
        let names: Vec<&str> = related.iter().map(|a| a.name.as_str()).collect();
        assert_eq!(names, vec!["AZ", "Mobb Deep"]);

        let req = fake.requests().into_iter().find(|r| r.url.ends_with("related-artists"));
        assert_eq!(req.as_ref().map(|r| r.method), Some(Method::Get));
        assert_eq!(req.as_ref().and_then(|r| r.bearer.as_deref()), Some("tok"));
        Ok(())
    }

    #[tokio::test]
    async fn all_tracks_walk_albums_and_singles() -> Result<(), SpotifyError> {
        let albums = format!(
            r#"{{"items":[{},{}],"next":null}}"#,
            album("al1", "album", "1994-04-19"),
            album("s1", "single", "1994-10-01")
        );
        let (client, fake) = client(
            FakeTransport::new()
                .on("artists/a1/albums", &albums)
                .on("albums/al1/tracks", r#"{"items":[{"id":"t1","name":"N.Y. State of Mind"}],"next":null}"#)
                .on("albums/s1/tracks", r#"{"items":[{"id":"t2","name":"One Love"}],"next":null}"#)
                .on("tracks/t1", r#"{"id":"t1","name":"N.Y. State of Mind","popularity":60}"#)
                .on("tracks/t2", r#"{"id":"t2","name":"One Love","popularity":55}"#)
        );

        let tracks = client.get_artist_all_tracks("a1").await?;
        let ids: Vec<&str> = tracks.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, vec!["t1", "t2"]);
        assert_eq!(tracks[1].popularity, Some(55));

        let listing = fake.requests().into_iter().find(|r| r.url.ends_with("artists/a1/albums"));
        assert_eq!(listing.as_ref().and_then(|r| r.query_value("include_groups")), Some("album,single"));
        let page = fake.requests().into_iter().find(|r| r.url.ends_with("albums/al1/tracks"));
        assert_eq!(page.as_ref().and_then(|r| r.query_value("limit")), Some("50"));
        assert_eq!(page.as_ref().and_then(|r| r.query_value("offset")), Some("0"));
        Ok(())
    }

    fn live() -> bool {
        std::env::var("LIVE_HTTP").ok().as_deref() == Some("1")
    }

    #[tokio::test]
    async fn spotify_client_testbench() -> Result<(), FlowError> {
        dotenvy::dotenv().ok();
        if !live() {
            eprintln!("Set LIVE_HTTP=1 to run");
            return Ok(())
        }

        let cfgs = crate::config::load_config()?;
        let spotify = SpotifyClient::from_config(&cfgs)?;
        let found = spotify.search_artists("Kendrick Lamar", 1, 0).await?;
        let artist = found.first().ok_or_else(|| FlowError::NotFound("kendrick".into()))?;

        let stats = spotify.get_artist_stats(&artist.id, None).await?;
        println!("{}", serde_json::to_string_pretty(&stats)?);
        assert!(stats.album_counts.total > 0);
        Ok(())
    }
}
