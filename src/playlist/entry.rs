//! Parsed playlist entries.

use std::fmt;

use serde::Serialize;

use super::classify::{MediaType, SeasonEpisode};

/// Identity of an entry within one parse result (its output position).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct EntryId(pub usize);

impl fmt::Display for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// One classified playlist item.
///
/// Entries are immutable once produced by the parser. Mutable download state
/// lives in [`crate::library::EntryState`], keyed by [`EntryId`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlaylistEntry {
    /// Position in the parser's output.
    pub id: EntryId,
    /// Classification; never [`MediaType::Live`].
    pub media_type: MediaType,
    /// Free-text group label, possibly empty.
    pub group_label: String,
    /// Display title, never empty.
    pub title: String,
    /// Season/episode pair when one was found in the title.
    #[serde(flatten)]
    pub season_episode: Option<SeasonEpisode>,
    /// `tvg-logo` attribute, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub logo_url: Option<String>,
    /// Lower-case extension with leading dot, or empty.
    pub file_extension: String,
    /// Absolute fetch URL.
    pub source_url: String,
}

impl PlaylistEntry {
    /// Season number, when known.
    #[must_use]
    pub fn season(&self) -> Option<u32> {
        self.season_episode.map(|se| se.season)
    }

    /// Episode number, when known.
    #[must_use]
    pub fn episode(&self) -> Option<u32> {
        self.season_episode.map(|se| se.episode)
    }

    /// Lower-cased `title group url` text used for free-text search.
    #[must_use]
    pub fn search_text(&self) -> String {
        format!("{} {} {}", self.title, self.group_label, self.source_url).to_lowercase()
    }
}
