//! M3U Organizer Core Library
//!
//! This library provides the core functionality for the m3u-organizer tool,
//! which turns IPTV playlists into a locally organized movie and series
//! library.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//! - [`playlist`] - Streaming playlist parser, encoding detection, classification
//! - [`download`] - Resumable HTTP downloads and remote playlist retrieval
//! - [`library`] - Path planning, existing-file index, catalog state and filters
//! - [`batch`] - Sequential batch orchestration over selected entries

// Clippy lints - strict for library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod batch;
pub mod download;
pub mod library;
pub mod playlist;

#[cfg(test)]
mod test_support;

// Re-export commonly used types
pub use batch::{BatchDownloader, BatchEvent, BatchSummary, DEFAULT_DELAY_BETWEEN_FILES};
pub use download::{
    DownloadError, DownloadOutcome, DownloadProgress, FailureType, HttpClient, RetryDecision,
    RetryPolicy, classify_error,
};
pub use library::{
    Catalog, EntryFilter, EntryState, EntryStatus, ExistingIndex, Facets, TypeFilter,
    build_index, normalize_path, plan_target_path,
};
pub use playlist::{
    ClassifierRules, EntryId, MediaType, ParseError, ParseProgress, PlaylistEntry,
    SeasonEpisode, parse_playlist, parse_playlist_with_rules,
};
pub use tokio_util::sync::CancellationToken;
