//!
//! src/musixmatch/mod.rs
//!
//! Lyrics metadata provider
//!

pub mod client;
pub mod models;

pub use client::{MusixmatchClient, MXM_MAX_PAGE};
pub use models::{MxmArtist, MxmLyrics, MxmTrack};
