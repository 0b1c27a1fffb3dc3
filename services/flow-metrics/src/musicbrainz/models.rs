//!
//! src/musicbrainz/models.rs
//!
//! Typed records for the MusicBrainz JSON web service (ws/2). Keys are
//! hyphenated on the wire; list payloads also accept the older "-list"
//! spellings
//!

use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct LifeSpan {
    #[serde(default)]
    pub begin: Option<String>,
    #[serde(default)]
    pub end: Option<String>,
    #[serde(default)]
    pub ended: Option<bool>
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct Area {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: String,
    #[serde(default, rename = "sort-name")]
    pub sort_name: Option<String>
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct Tag {
    pub name: String,
    #[serde(default)]
    pub count: i64
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct Alias {
    pub name: String,
    #[serde(default, rename = "sort-name")]
    pub sort_name: Option<String>,
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
    #[serde(default)]
    pub locale: Option<String>
}

/// Link to another entity. Only the target kinds this crate reads are typed
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct Relation {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, rename = "target-type")]
    pub target_type: Option<String>,
    #[serde(default)]
    pub direction: Option<String>,
    #[serde(default)]
    pub artist: Option<ArtistRef>,
    #[serde(default)]
    pub url: Option<UrlRef>
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct ArtistRef {
    pub id: String,
    pub name: String,
    #[serde(default, rename = "sort-name")]
    pub sort_name: Option<String>,
    #[serde(default)]
    pub disambiguation: Option<String>
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct UrlRef {
    #[serde(default)]
    pub id: Option<String>,
    pub resource: String
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct ArtistCredit {
    pub name: String,
    #[serde(default)]
    pub joinphrase: Option<String>,
    #[serde(default)]
    pub artist: Option<ArtistRef>
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct MbArtist {
    pub id: String,
    pub name: String,
    #[serde(default, rename = "sort-name")]
    pub sort_name: Option<String>,
    #[serde(default)]
    pub disambiguation: Option<String>,
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
    #[serde(default)]
    pub gender: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default, alias = "ext:score")]
    pub score: Option<u32>,
    #[serde(default, rename = "life-span")]
    pub life_span: Option<LifeSpan>,
    #[serde(default)]
    pub area: Option<Area>,
    #[serde(default)]
    pub tags: Vec<Tag>,
    #[serde(default, alias = "alias-list")]
    pub aliases: Vec<Alias>,
    #[serde(default, alias = "relation-list")]
    pub relations: Vec<Relation>,
    #[serde(default)]
    pub rating: Option<Value>
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct MbReleaseGroup {
    pub id: String,
    pub title: String,
    #[serde(default, rename = "primary-type")]
    pub primary_type: Option<String>,
    #[serde(default, rename = "secondary-types")]
    pub secondary_types: Vec<String>,
    #[serde(default, rename = "first-release-date")]
    pub first_release_date: Option<String>,
    #[serde(default)]
    pub disambiguation: Option<String>,
    #[serde(default, alias = "ext:score")]
    pub score: Option<u32>,
    #[serde(default, rename = "artist-credit")]
    pub artist_credit: Vec<ArtistCredit>
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct MbRelease {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub barcode: Option<String>,
    #[serde(default, alias = "ext:score")]
    pub score: Option<u32>,
    #[serde(default, rename = "release-group")]
    pub release_group: Option<MbReleaseGroup>,
    #[serde(default, alias = "medium-list")]
    pub media: Vec<Medium>
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct Medium {
    #[serde(default)]
    pub position: Option<u32>,
    #[serde(default)]
    pub format: Option<String>,
    #[serde(default, rename = "track-count")]
    pub track_count: Option<u32>,
    #[serde(default, alias = "track-list")]
    pub tracks: Vec<MbTrack>
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct MbTrack {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub number: Option<String>,
    #[serde(default)]
    pub length: Option<u64>,
    #[serde(default)]
    pub recording: Option<MbRecording>
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct MbRecording {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub length: Option<u64>,
    #[serde(default)]
    pub disambiguation: Option<String>,
    #[serde(default, alias = "ext:score")]
    pub score: Option<u32>,
    #[serde(default, alias = "isrc-list")]
    pub isrcs: Vec<String>,
    #[serde(default, rename = "artist-credit")]
    pub artist_credit: Vec<ArtistCredit>
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct MbWork {
    pub id: String,
    pub title: String,
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default, alias = "ext:score")]
    pub score: Option<u32>
}

/// Search and browse payloads. Search reports `count`/`offset`, browse
/// reports `<entity>-count`/`<entity>-offset`
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ArtistList {
    #[serde(default, alias = "artist-count")]
    pub count: u32,
    #[serde(default, alias = "artist-offset")]
    pub offset: u32,
    #[serde(default, alias = "artist-list")]
    pub artists: Vec<MbArtist>
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ReleaseGroupList {
    #[serde(default, alias = "release-group-count")]
    pub count: u32,
    #[serde(default, alias = "release-group-offset")]
    pub offset: u32,
    #[serde(default, rename = "release-groups", alias = "release-group-list")]
    pub release_groups: Vec<MbReleaseGroup>
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ReleaseList {
    #[serde(default, alias = "release-count")]
    pub count: u32,
    #[serde(default, alias = "release-offset")]
    pub offset: u32,
    #[serde(default, alias = "release-list")]
    pub releases: Vec<MbRelease>
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RecordingList {
    #[serde(default, alias = "recording-count")]
    pub count: u32,
    #[serde(default, alias = "recording-offset")]
    pub offset: u32,
    #[serde(default, alias = "recording-list")]
    pub recordings: Vec<MbRecording>
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct WorkList {
    #[serde(default, alias = "work-count")]
    pub count: u32,
    #[serde(default, alias = "work-offset")]
    pub offset: u32,
    #[serde(default, alias = "work-list")]
    pub works: Vec<MbWork>
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct CoverArtImage {
    pub image: String,
    #[serde(default)]
    pub front: bool,
    #[serde(default)]
    pub back: bool,
    #[serde(default)]
    pub types: Vec<String>,
    #[serde(default)]
    pub thumbnails: Value
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct CoverArt {
    #[serde(default)]
    pub images: Vec<CoverArtImage>,
    #[serde(default)]
    pub release: Option<String>
}

/// Release-group counts by type. A group counts once toward its primary
/// type (unknown types land in `other`) and once per secondary type that
/// names a bucket
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct ReleaseCounts {
    pub album: u32,
    pub single: u32,
    pub ep: u32,
    pub compilation: u32,
    pub soundtrack: u32,
    pub live: u32,
    pub remix: u32,
    pub other: u32,
    pub total: u32
}

impl ReleaseCounts {
    fn bucket(&mut self, kind: &str) -> Option<&mut u32> {
        match kind {
            "album" => Some(&mut self.album),
            "single" => Some(&mut self.single),
            "ep" => Some(&mut self.ep),
            "compilation" => Some(&mut self.compilation),
            "soundtrack" => Some(&mut self.soundtrack),
            "live" => Some(&mut self.live),
            "remix" => Some(&mut self.remix),
            "other" => Some(&mut self.other),
            _ => None
        }
    }

    pub fn add(&mut self, group: &MbReleaseGroup) {
        self.total += 1;

        let primary = group
            .primary_type
            .as_deref()
            .unwrap_or("other")
            .to_lowercase();
        match self.bucket(&primary) {
            Some(count) => *count += 1,
            None => self.other += 1
        }

        for secondary in &group.secondary_types {
            if let Some(count) = self.bucket(&secondary.to_lowercase()) {
                *count += 1;
            }
        }
    }

    pub fn tally(groups: &[MbReleaseGroup]) -> Self {
        let mut counts = Self::default();
        for group in groups {
            counts.add(group);
        }
        counts
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ArtistInfo {
    pub artist: MbArtist,
    pub release_group_counts: ReleaseCounts,
    pub all_release_groups: Vec<MbReleaseGroup>
}

#[cfg(test)]
mod tests {
    use super::*;

    fn group(primary: Option<&str>, secondary: &[&str]) -> MbReleaseGroup {
        MbReleaseGroup {
            id: "rg".into(),
            title: "t".into(),
            primary_type: primary.map(str::to_string),
            secondary_types: secondary.iter().map(|s| s.to_string()).collect(),
            ..Default::default()
        }
    }

    #[test]
    fn counts_primary_and_matching_secondary_types() {
        let counts = ReleaseCounts::tally(&[
            group(Some("Album"), &[]),
            group(Some("Album"), &["Compilation", "Live"]),
            group(Some("Single"), &["Remix"]),
            group(Some("Broadcast"), &[]),
            group(None, &["DJ-mix"]),
            group(Some("EP"), &["Soundtrack"]),
        ]);

        assert_eq!(counts, ReleaseCounts {
            album: 2, single: 1, ep: 1, compilation: 1, soundtrack: 1,
            live: 1, remix: 1, other: 2, total: 6
        });
    }

    #[test]
    fn search_payload_parses_json_keys_and_scores() -> Result<(), serde_json::Error> {
        let list: ArtistList = serde_json::from_str(r#"{
            "created": "2024-01-01T00:00:00.000Z", "count": 2, "offset": 0,
            "artists": [
                {"id": "a1", "name": "Nas", "score": 100, "country": "US",
                 "life-span": {"begin": "1973-09-14", "ended": null},
                 "sort-name": "Nas", "type": "Person"},
                {"id": "a2", "name": "Nas & Ill Will", "ext:score": 81}
            ]
        }"#)?;
        assert_eq!(list.count, 2);
        assert_eq!(list.artists[0].score, Some(100));
        assert_eq!(list.artists[0].kind.as_deref(), Some("Person"));
        assert_eq!(
            list.artists[0].life_span.as_ref().and_then(|l| l.begin.as_deref()),
            Some("1973-09-14")
        );
        assert_eq!(list.artists[1].score, Some(81));
        Ok(())
    }

    #[test]
    fn browse_payload_uses_entity_counts() -> Result<(), serde_json::Error> {
        let list: ReleaseGroupList = serde_json::from_str(r#"{
            "release-group-count": 140, "release-group-offset": 100,
            "release-groups": [{"id": "rg1", "title": "Illmatic",
                "primary-type": "Album", "secondary-types": [],
                "first-release-date": "1994-04-19"}]
        }"#)?;
        assert_eq!(list.count, 140);
        assert_eq!(list.offset, 100);
        assert_eq!(list.release_groups[0].first_release_date.as_deref(), Some("1994-04-19"));
        Ok(())
    }
}
