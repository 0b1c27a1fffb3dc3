//!
//! src/lib.rs
//!
//! Music metadata and lyrics aggregation. Provider clients for Spotify,
//! MusicBrainz and Musixmatch, a multi-source lyrics scraper, cross-provider
//! entity matching, vocabulary analysis and a sqlite document store
//!

pub mod config;
pub mod errors;
pub mod logging;

pub mod http;
pub mod rate_limit;
pub mod paginate;
pub mod timeline;

pub mod spotify;
pub mod musicbrainz;
pub mod musixmatch;
pub mod lyrics;

pub mod matching;
pub mod vocabulary;
pub mod document;
pub mod persistent;
pub mod collect;

#[cfg(test)]
mod test_utils;
