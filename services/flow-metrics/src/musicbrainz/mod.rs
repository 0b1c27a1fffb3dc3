//!
//! src/musicbrainz/mod.rs
//!
//! Community metadata database provider plus the Cover Art Archive
//!

pub mod client;
pub mod models;

pub use client::{MusicBrainzClient, MB_DEFAULT_LIMIT, MB_MAX_PAGE};
pub use models::{
    ArtistInfo, ArtistList, LifeSpan, MbArtist, MbRecording, MbRelease, MbReleaseGroup,
    ReleaseCounts,
};
