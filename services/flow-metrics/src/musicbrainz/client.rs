//!
//! src/musicbrainz/client.rs
//!
//! MusicBrainz ws/2 client. Every request goes through a one second rate
//! gate, identifies the application in its User-Agent and asks for json
//!

use std::sync::Arc;

use serde::de::DeserializeOwned;
use tracing::debug;
use url::Url;

use crate::config::{AppConfig, MusicBrainzConfig};
use crate::errors::{FlowError, MusicBrainzError};
use crate::http::{HttpRequest, ReqwestTransport, Transport};
use crate::paginate::{Page, Paginator};
use crate::rate_limit::RateGate;
use crate::timeline::{build_timeline, DateOrder, Timeline};

use super::models::*;

pub const MB_MAX_PAGE: u32 = 100;
pub const MB_DEFAULT_LIMIT: u32 = 25;

/// Relation types treated as artist similarity
const SIMILAR_RELATIONS: [&str; 3] = ["similar", "influenced by", "influence"];

pub struct MusicBrainzClient {
    transport: Arc<dyn Transport>,
    base: Url,
    cover_art: Url,
    gate: RateGate
}

/// Appends filter clauses to a lucene query, quoting the query when strict
fn lucene(query: &str, strict: bool, filters: &[(&str, Option<&str>)]) -> String {
    let mut q = if strict {
        format!("\"{}\"", query.replace('"', "\\\""))
    } else {
        query.to_string()
    };
    for (field, value) in filters {
        if let Some(value) = value {
            q.push_str(&format!(" AND {field}:{value}"));
        }
    }
    q
}

impl MusicBrainzClient {
    pub fn new(transport: Arc<dyn Transport>, cfg: &MusicBrainzConfig) -> Self {
        Self {
            transport,
            base: cfg.base_url.clone(),
            cover_art: cfg.cover_art_url.clone(),
            gate: RateGate::new(cfg.min_interval)
        }
    }

    pub fn from_config(app: &AppConfig) -> Result<Self, FlowError> {
        let transport = ReqwestTransport::json(&app.http, Some(&app.musicbrainz.user_agent))?;
        Ok( Self::new(Arc::new(transport), &app.musicbrainz) )
    }

    async fn fetch<T: DeserializeOwned>(&self, request: HttpRequest, context: &str) ->
        Result<T, MusicBrainzError> {

        self.gate.wait_if_needed().await;
        debug!(url = %request.url, query = ?request.query, "musicbrainz.request");

        let response = self.transport
            .execute(request)
            .await
            .map_err(|e| MusicBrainzError::new(format!("{context}: {e}")))?;

        if !response.is_success() {
            let detail = serde_json::from_str::<serde_json::Value>(&response.body)
                .ok()
                .and_then(|v| v.get("error").and_then(|m| m.as_str()).map(str::to_string))
                .unwrap_or_else(|| format!("HTTP {}", response.status));
            return Err(MusicBrainzError::with_status(
                format!("{context}: {detail}"), response.status
            ));
        }

        response
            .json()
            .map_err(|e| MusicBrainzError::new(format!("{context}: invalid response: {e}")))
    }

    /// GET /ws/2/{endpoint}?fmt=json&...
    async fn request<T: DeserializeOwned>(&self, endpoint: &str, params: &[(&str, String)]) ->
        Result<T, MusicBrainzError> {

        let url = self.base
            .join(endpoint)
            .map_err(|e| MusicBrainzError::new(format!("bad endpoint {endpoint}: {e}")))?;

        let mut request = HttpRequest::get(url.as_str());
        for (key, value) in params {
            request = request.query(key, value);
        }
        request = request.query("fmt", "json");
        self.fetch(request, &format!("GET {endpoint}")).await
    }

    fn paging(limit: u32, offset: u32) -> [(&'static str, String); 2] {
        [("limit", limit.min(MB_MAX_PAGE).to_string()), ("offset", offset.to_string())]
    }

    /// GET /ws/2/artist?query=
    pub async fn search_artists(&self, query: &str, limit: u32, offset: u32, strict: bool) ->
        Result<ArtistList, MusicBrainzError> {
        let mut params = vec![("query", lucene(query, strict, &[]))];
        params.extend(Self::paging(limit, offset));
        self.request("artist", &params).await
    }

    /// GET /ws/2/release-group?query=  optionally restricted to one artist
    pub async fn search_release_groups(
        &self,
        query: &str,
        artist_id: Option<&str>,
        limit: u32,
        offset: u32,
        strict: bool
    ) -> Result<ReleaseGroupList, MusicBrainzError> {
        let mut params = vec![("query", lucene(query, strict, &[("arid", artist_id)]))];
        params.extend(Self::paging(limit, offset));
        self.request("release-group", &params).await
    }

    /// GET /ws/2/release?query=
    pub async fn search_releases(
        &self,
        query: &str,
        artist_id: Option<&str>,
        release_group_id: Option<&str>,
        limit: u32,
        offset: u32
    ) -> Result<ReleaseList, MusicBrainzError> {
        let q = lucene(query, false, &[("arid", artist_id), ("rgid", release_group_id)]);
        let mut params = vec![("query", q)];
        params.extend(Self::paging(limit, offset));
        self.request("release", &params).await
    }

    /// GET /ws/2/recording?query=
    pub async fn search_recordings(
        &self,
        query: &str,
        artist_id: Option<&str>,
        release_id: Option<&str>,
        limit: u32,
        offset: u32
    ) -> Result<RecordingList, MusicBrainzError> {
        let q = lucene(query, false, &[("arid", artist_id), ("reid", release_id)]);
        let mut params = vec![("query", q)];
        params.extend(Self::paging(limit, offset));
        self.request("recording", &params).await
    }

    /// GET /ws/2/work?query=
    pub async fn search_works(&self, query: &str, limit: u32, offset: u32) ->
        Result<WorkList, MusicBrainzError> {
        let mut params = vec![("query", query.to_string())];
        params.extend(Self::paging(limit, offset));
        self.request("work", &params).await
    }

    async fn lookup<T: DeserializeOwned>(&self, entity: &str, id: &str, includes: &[&str]) ->
        Result<T, MusicBrainzError> {
        let mut params = Vec::new();
        if !includes.is_empty() {
            params.push(("inc", includes.join("+")));
        }
        self.request(&format!("{entity}/{id}"), &params).await
    }

    /// GET /ws/2/artist/{mbid}?inc=
    pub async fn get_artist(&self, artist_id: &str, includes: &[&str]) ->
        Result<MbArtist, MusicBrainzError> {
        self.lookup("artist", artist_id, includes).await
    }

    pub async fn get_release_group(&self, release_group_id: &str, includes: &[&str]) ->
        Result<MbReleaseGroup, MusicBrainzError> {
        self.lookup("release-group", release_group_id, includes).await
    }

    pub async fn get_release(&self, release_id: &str, includes: &[&str]) ->
        Result<MbRelease, MusicBrainzError> {
        self.lookup("release", release_id, includes).await
    }

    pub async fn get_recording(&self, recording_id: &str, includes: &[&str]) ->
        Result<MbRecording, MusicBrainzError> {
        self.lookup("recording", recording_id, includes).await
    }

    pub async fn get_work(&self, work_id: &str, includes: &[&str]) ->
        Result<MbWork, MusicBrainzError> {
        self.lookup("work", work_id, includes).await
    }

    /// GET /ws/2/release?artist=&type=&status=&inc=
    pub async fn browse_artist_releases(
        &self,
        artist_id: &str,
        release_types: &[&str],
        statuses: &[&str],
        includes: &[&str],
        limit: u32,
        offset: u32
    ) -> Result<ReleaseList, MusicBrainzError> {
        let mut params = vec![("artist", artist_id.to_string())];
        if !release_types.is_empty() {
            params.push(("type", release_types.join("|")));
        }
        if !statuses.is_empty() {
            params.push(("status", statuses.join("|")));
        }
        if !includes.is_empty() {
            params.push(("inc", includes.join("+")));
        }
        params.extend(Self::paging(limit, offset));
        self.request("release", &params).await
    }

    /// GET /ws/2/release-group?artist=&type=&inc=
    pub async fn browse_artist_release_groups(
        &self,
        artist_id: &str,
        release_types: &[&str],
        includes: &[&str],
        limit: u32,
        offset: u32
    ) -> Result<ReleaseGroupList, MusicBrainzError> {
        let mut params = vec![("artist", artist_id.to_string())];
        if !release_types.is_empty() {
            params.push(("type", release_types.join("|")));
        }
        if !includes.is_empty() {
            params.push(("inc", includes.join("+")));
        }
        params.extend(Self::paging(limit, offset));
        self.request("release-group", &params).await
    }

    /// GET /ws/2/recording?release=
    pub async fn browse_release_recordings(&self, release_id: &str, limit: u32, offset: u32) ->
        Result<RecordingList, MusicBrainzError> {
        let mut params = vec![("release", release_id.to_string())];
        params.extend(Self::paging(limit, offset));
        self.request("recording", &params).await
    }

    /// GET coverartarchive.org/release/{mbid}
    pub async fn get_cover_art(&self, release_id: &str) -> Result<CoverArt, MusicBrainzError> {
        let url = self.cover_art
            .join(&format!("release/{release_id}"))
            .map_err(|e| MusicBrainzError::new(format!("bad cover art id {release_id}: {e}")))?;
        self.fetch(HttpRequest::get(url.as_str()), "GET cover art").await
    }

    pub async fn get_cover_art_front(&self, release_id: &str) ->
        Result<Option<String>, MusicBrainzError> {
        let art = self.get_cover_art(release_id).await?;
        Ok( art.images.into_iter().find(|image| image.front).map(|image| image.image) )
    }

    /// Every release group credited to the artist, with artist credits
    pub async fn get_all_artist_release_groups(&self, artist_id: &str) ->
        Result<Vec<MbReleaseGroup>, MusicBrainzError> {
        Paginator::new(MB_MAX_PAGE)
            .collect(|req| async move {
                let list = self
                    .browse_artist_release_groups(
                        artist_id, &[], &["artist-credits"], req.limit, req.offset
                    )
                    .await?;
                Ok::<_, MusicBrainzError>(Page::sized(list.release_groups, req.limit))
            })
            .await
    }

    /// Release groups by year of first release, oldest first inside each year
    pub async fn get_artist_timeline(&self, artist_id: &str) ->
        Result<Timeline<MbReleaseGroup>, MusicBrainzError> {
        let groups = self.get_all_artist_release_groups(artist_id).await?;
        Ok( build_timeline(groups, |g| g.first_release_date.as_deref(), DateOrder::Ascending) )
    }

    pub async fn get_artist_info(&self, artist_id: &str) ->
        Result<ArtistInfo, MusicBrainzError> {
        let artist = self
            .get_artist(artist_id, &["url-rels", "aliases", "tags", "ratings"])
            .await?;
        let all_release_groups = self.get_all_artist_release_groups(artist_id).await?;
        let release_group_counts = ReleaseCounts::tally(&all_release_groups);

        Ok( ArtistInfo { artist, release_group_counts, all_release_groups } )
    }

    /// Artists linked through similarity or influence relations
    pub async fn find_similar_artists(&self, artist_id: &str) ->
        Result<Vec<ArtistRef>, MusicBrainzError> {
        let artist = self.get_artist(artist_id, &["artist-rels"]).await?;
        Ok( artist.relations
            .into_iter()
            .filter(|rel| SIMILAR_RELATIONS.contains(&rel.kind.as_str()))
            .filter_map(|rel| rel.artist)
            .collect() )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use crate::http::HttpResponse;
    use crate::test_utils::FakeTransport;
    use std::time::Duration;

    fn client(fake: FakeTransport) -> (MusicBrainzClient, Arc<FakeTransport>) {
        let mut cfg = match AppConfig::from_lookup(&|_| None) {
            Ok(cfg) => cfg.musicbrainz,
            Err(e) => panic!("default config: {e}")
        };
        cfg.min_interval = Duration::ZERO;
        let fake = Arc::new(fake);
        (MusicBrainzClient::new(fake.clone(), &cfg), fake)
    }

    fn groups_page(start: usize, count: usize) -> String {
        let groups: Vec<String> = (start..start + count)
            .map(|i| format!(
                r#"{{"id":"rg{i}","title":"Release {i}","primary-type":"Album","first-release-date":"{}-0{}-01"}}"#,
                1990 + i / 3, 1 + i % 3
            ))
            .collect();
        format!(r#"{{"release-group-count":250,"release-groups":[{}]}}"#, groups.join(","))
    }

    #[tokio::test]
    async fn every_request_asks_for_json() -> Result<(), MusicBrainzError> {
        let (client, fake) = client(FakeTransport::new().on("ws/2/artist", r#"{"count":0,"artists":[]}"#));
        client.search_artists("Nas", 10, 0, true).await?;

        let req = &fake.requests()[0];
        assert_eq!(req.query_value("fmt"), Some("json"));
        assert_eq!(req.query_value("query"), Some("\"Nas\""));
        assert_eq!(req.query_value("limit"), Some("10"));
        Ok(())
    }

    #[tokio::test]
    async fn work_search_sends_the_raw_query() -> Result<(), MusicBrainzError> {
        let (client, fake) = client(FakeTransport::new().on(
            "ws/2/work",
            r#"{"work-count":1,"work-offset":0,"works":[{"id":"w1","title":"The World Is Yours","type":"Song","score":100}]}"#
        ));

        let found = client.search_works("title:\"The World Is Yours\"", 500, 5).await?;
        assert_eq!(found.count, 1);
        assert_eq!(found.works[0].kind.as_deref(), Some("Song"));

        let req = &fake.requests()[0];
        assert!(req.url.ends_with("/ws/2/work"));
        assert_eq!(req.query_value("query"), Some("title:\"The World Is Yours\""));
        assert_eq!(req.query_value("limit"), Some("100"));
        assert_eq!(req.query_value("offset"), Some("5"));
        assert_eq!(req.query_value("fmt"), Some("json"));
        Ok(())
    }

    #[tokio::test]
    async fn release_browse_joins_filters() -> Result<(), MusicBrainzError> {
        let (client, fake) = client(FakeTransport::new().on(
            "ws/2/release",
            r#"{"release-count":1,"release-offset":0,"releases":[{"id":"r1","title":"Illmatic","status":"Official"}]}"#
        ));

        let found = client
            .browse_artist_releases("mb1", &["album", "ep"], &["official"], &["labels", "recordings"], 25, 0)
            .await?;
        assert_eq!(found.releases.len(), 1);
        assert_eq!(found.releases[0].title, "Illmatic");

        let req = &fake.requests()[0];
        assert!(req.url.ends_with("/ws/2/release"));
        assert_eq!(req.query_value("artist"), Some("mb1"));
        assert_eq!(req.query_value("type"), Some("album|ep"));
        assert_eq!(req.query_value("status"), Some("official"));
        assert_eq!(req.query_value("inc"), Some("labels+recordings"));
        assert_eq!(req.query_value("query"), None);

        client.browse_artist_releases("mb1", &[], &[], &[], 25, 25).await?;
        let bare = &fake.requests()[1];
        assert_eq!(bare.query_value("type"), None);
        assert_eq!(bare.query_value("inc"), None);
        assert_eq!(bare.query_value("offset"), Some("25"));
        Ok(())
    }

    #[tokio::test]
    async fn recording_browse_is_keyed_by_release() -> Result<(), MusicBrainzError> {
        let (client, fake) = client(FakeTransport::new().on(
            "ws/2/recording",
            r#"{"recording-count":2,"recording-offset":0,"recordings":[{"id":"c1","title":"Genesis","length":105000},{"id":"c2","title":"N.Y. State of Mind"}]}"#
        ));

        let found = client.browse_release_recordings("r1", 100, 0).await?;
        assert_eq!(found.count, 2);
        assert_eq!(found.recordings[0].length, Some(105000));

        let req = &fake.requests()[0];
        assert!(req.url.ends_with("/ws/2/recording"));
        assert_eq!(req.query_value("release"), Some("r1"));
        assert_eq!(req.query_value("limit"), Some("100"));
        assert_eq!(req.query_value("fmt"), Some("json"));
        Ok(())
    }

    #[tokio::test]
    async fn search_filters_become_lucene_clauses() -> Result<(), MusicBrainzError> {
        let (client, fake) = client(
            FakeTransport::new().on("ws/2/recording", r#"{"count":0,"recordings":[]}"#)
        );
        client.search_recordings("Alright", Some("mb-k1"), None, 500, 0).await?;

        let req = &fake.requests()[0];
        assert_eq!(req.query_value("query"), Some("Alright AND arid:mb-k1"));
        assert_eq!(req.query_value("limit"), Some("100"));
        Ok(())
    }

    #[tokio::test]
    async fn lookups_join_includes_with_plus() -> Result<(), MusicBrainzError> {
        let (client, fake) = client(
            FakeTransport::new().on("artist/mb-1", r#"{"id":"mb-1","name":"Nas"}"#)
        );
        client.get_artist("mb-1", &["aliases", "tags"]).await?;
        assert_eq!(fake.requests()[0].query_value("inc"), Some("aliases+tags"));
        Ok(())
    }

    #[tokio::test]
    async fn release_groups_paginate_until_short_page() -> Result<(), MusicBrainzError> {
        let (client, fake) = client(FakeTransport::new().route(|req| {
            if !req.url.ends_with("ws/2/release-group") {
                return None;
            }
            let body = match req.query_value("offset") {
                Some("0") => groups_page(0, 100),
                Some("100") => groups_page(100, 100),
                _ => groups_page(200, 50)
            };
            Some(Ok(HttpResponse::ok(body)))
        }));

        let groups = client.get_all_artist_release_groups("mb-1").await?;
        assert_eq!(groups.len(), 250);
        assert_eq!(groups[0].id, "rg0");
        assert_eq!(groups[249].id, "rg249");
        assert_eq!(fake.count("ws/2/release-group"), 3);
        assert_eq!(fake.requests()[0].query_value("artist"), Some("mb-1"));
        assert_eq!(fake.requests()[0].query_value("inc"), Some("artist-credits"));
        Ok(())
    }

    #[tokio::test]
    async fn timeline_drops_undated_and_sorts_ascending() -> Result<(), MusicBrainzError> {
        let (client, _) = client(FakeTransport::new().on("ws/2/release-group", r#"{
            "release-groups": [
                {"id": "b", "title": "It Was Written", "first-release-date": "1996-07-02"},
                {"id": "x", "title": "Undated"},
                {"id": "c", "title": "Late 94", "first-release-date": "1994-10-01"},
                {"id": "a", "title": "Illmatic", "first-release-date": "1994-04-19"}
            ]
        }"#));

        let timeline = client.get_artist_timeline("mb-1").await?;
        let years: Vec<&String> = timeline.keys().collect();
        assert_eq!(years, vec!["1994", "1996"]);
        let ids: Vec<&str> = timeline["1994"].iter().map(|g| g.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "c"]);
        Ok(())
    }

    #[tokio::test]
    async fn artist_info_counts_release_groups() -> Result<(), MusicBrainzError> {
        let (client, _) = client(
            FakeTransport::new()
                .on("artist/mb-1", r#"{"id":"mb-1","name":"Nas","country":"US"}"#)
                .on("ws/2/release-group", r#"{"release-groups":[
                    {"id":"1","title":"Illmatic","primary-type":"Album"},
                    {"id":"2","title":"Live","primary-type":"Album","secondary-types":["Live"]},
                    {"id":"3","title":"One Mic","primary-type":"Single"}
                ]}"#)
        );

        let info = client.get_artist_info("mb-1").await?;
        assert_eq!(info.artist.country.as_deref(), Some("US"));
        assert_eq!(info.release_group_counts.album, 2);
        assert_eq!(info.release_group_counts.live, 1);
        assert_eq!(info.release_group_counts.single, 1);
        assert_eq!(info.release_group_counts.total, 3);
        assert_eq!(info.all_release_groups.len(), 3);
        Ok(())
    }

    #[tokio::test]
    async fn similar_artists_come_from_relations() -> Result<(), MusicBrainzError> {
        let (client, _) = client(FakeTransport::new().on("artist/mb-1", r#"{
            "id": "mb-1", "name": "Nas",
            "relations": [
                {"type": "influenced by", "target-type": "artist",
                 "artist": {"id": "mb-2", "name": "Rakim"}},
                {"type": "member of band", "target-type": "artist",
                 "artist": {"id": "mb-3", "name": "The Firm"}},
                {"type": "official homepage", "target-type": "url",
                 "url": {"resource": "https://nasirjones.com"}}
            ]
        }"#));

        let similar = client.find_similar_artists("mb-1").await?;
        let names: Vec<&str> = similar.iter().map(|a| a.name.as_str()).collect();
        assert_eq!(names, vec!["Rakim"]);
        Ok(())
    }

    #[tokio::test]
    async fn cover_art_front_picks_front_image() -> Result<(), MusicBrainzError> {
        let (client, fake) = client(FakeTransport::new().on("release/rel-1", r#"{"images":[
            {"image":"https://coverartarchive.org/back.jpg","front":false,"back":true},
            {"image":"https://coverartarchive.org/front.jpg","front":true}
        ]}"#));

        let front = client.get_cover_art_front("rel-1").await?;
        assert_eq!(front.as_deref(), Some("https://coverartarchive.org/front.jpg"));
        assert!(fake.requests()[0].url.starts_with("https://coverartarchive.org/"));
        Ok(())
    }

    #[tokio::test]
    async fn service_errors_keep_status() {
        let (client, _) = client(FakeTransport::new().route(|req| {
            req.url.ends_with("artist/busy").then(|| {
                Ok(HttpResponse::new(503, r#"{"error":"Your requests are exceeding the allowable rate limit."}"#))
            })
        }));

        let err = client.get_artist("busy", &[]).await.err();
        assert_eq!(err.as_ref().and_then(|e| e.status_code), Some(503));
        assert!(err.is_some_and(|e| e.message.contains("allowable rate limit")));
    }

    fn live() -> bool {
        std::env::var("LIVE_HTTP").ok().as_deref() == Some("1")
    }

    #[tokio::test]
    async fn musicbrainz_client_testbench() -> Result<(), FlowError> {
        dotenvy::dotenv().ok();
        if !live() {
            eprintln!("Set LIVE_HTTP=1 to run");
            return Ok(())
        }

        let cfgs = crate::config::load_config()?;
        let mb = MusicBrainzClient::from_config(&cfgs)?;
        let found = mb.search_artists("Nas", 5, 0, false).await?;
        let artist = found.artists.first().ok_or_else(|| FlowError::NotFound("nas".into()))?;

        let timeline = mb.get_artist_timeline(&artist.id).await?;
        println!("{}", serde_json::to_string_pretty(&timeline)?);
        assert!(!timeline.is_empty());
        Ok(())
    }
}
