//!
//! src/spotify/mod.rs
//!
//! Streaming catalog provider: artists, albums, tracks
//!

pub mod client;
pub mod models;

pub use client::{album_kind, SpotifyClient, SPOTIFY_MAX_PAGE};
pub use models::{
    AlbumCounts, AlbumType, ArtistStats, Image, Paging, SpotifyAlbum, SpotifyArtist,
    SpotifyToken, SpotifyTrack,
};
