//! Entry filters and filter facets.

use std::collections::BTreeMap;
use std::str::FromStr;

use serde::Serialize;
use thiserror::Error;

use super::catalog::EntryState;
use crate::playlist::{MediaType, PlaylistEntry};

/// Error returned when a filter value cannot be parsed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid {kind} filter: {value:?} (expected {expected})")]
pub struct FilterParseError {
    kind: &'static str,
    value: String,
    expected: &'static str,
}

/// Which media types to show.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TypeFilter {
    /// Every entry.
    #[default]
    All,
    /// Movies and episodes.
    MoviesAndSeries,
    /// Episodes only.
    Series,
    /// Movies only.
    Movies,
}

impl TypeFilter {
    fn accepts(self, media_type: MediaType) -> bool {
        match self {
            Self::All => true,
            Self::MoviesAndSeries => media_type.is_downloadable(),
            Self::Series => media_type == MediaType::Episode,
            Self::Movies => media_type == MediaType::Movie,
        }
    }
}

impl FromStr for TypeFilter {
    type Err = FilterParseError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "all" => Ok(Self::All),
            "movies-and-series" => Ok(Self::MoviesAndSeries),
            "series" => Ok(Self::Series),
            "movies" => Ok(Self::Movies),
            _ => Err(FilterParseError {
                kind: "type",
                value: value.to_string(),
                expected: "all, movies-and-series, series or movies",
            }),
        }
    }
}

/// Group label filter. Matching is exact.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum GroupFilter {
    /// Any group.
    #[default]
    Any,
    /// Entries whose group label is blank.
    Ungrouped,
    /// Entries with exactly this group label.
    Named(String),
}

impl GroupFilter {
    /// Builds a filter from a label; a blank label selects ungrouped entries.
    #[must_use]
    pub fn from_label(label: &str) -> Self {
        if label.trim().is_empty() {
            Self::Ungrouped
        } else {
            Self::Named(label.to_string())
        }
    }

    fn accepts(&self, group: &str) -> bool {
        match self {
            Self::Any => true,
            Self::Ungrouped => group.trim().is_empty(),
            Self::Named(name) => group == name,
        }
    }
}

/// Season filter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SeasonFilter {
    /// Any season, including none.
    #[default]
    Any,
    /// Entries without a season number.
    NoSeason,
    /// Entries in this season.
    Season(u32),
}

impl SeasonFilter {
    fn accepts(self, season: Option<u32>) -> bool {
        match self {
            Self::Any => true,
            Self::NoSeason => season.is_none(),
            Self::Season(wanted) => season == Some(wanted),
        }
    }
}

impl FromStr for SeasonFilter {
    type Err = FilterParseError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim();
        if trimmed.eq_ignore_ascii_case("none") {
            return Ok(Self::NoSeason);
        }
        trimmed.parse().map(Self::Season).map_err(|_| FilterParseError {
            kind: "season",
            value: value.to_string(),
            expected: "a season number or none",
        })
    }
}

/// File extension filter. Matching is case-insensitive.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ExtensionFilter {
    /// Any extension, including none.
    #[default]
    Any,
    /// Entries without an extension.
    NoExtension,
    /// Entries with this extension (stored lower-case with a leading dot).
    Extension(String),
}

impl ExtensionFilter {
    fn accepts(&self, extension: &str) -> bool {
        match self {
            Self::Any => true,
            Self::NoExtension => extension.trim().is_empty(),
            Self::Extension(wanted) => extension.eq_ignore_ascii_case(wanted),
        }
    }
}

impl FromStr for ExtensionFilter {
    type Err = FilterParseError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim();
        if trimmed.eq_ignore_ascii_case("none") {
            return Ok(Self::NoExtension);
        }
        let bare = trimmed.trim_start_matches('.');
        if bare.is_empty() {
            return Err(FilterParseError {
                kind: "extension",
                value: value.to_string(),
                expected: "an extension such as .mkv, or none",
            });
        }
        Ok(Self::Extension(format!(".{}", bare.to_lowercase())))
    }
}

/// Combined view filter. The default accepts every entry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntryFilter {
    /// Media type restriction.
    pub media: TypeFilter,
    /// Group label restriction.
    pub group: GroupFilter,
    /// Season restriction.
    pub season: SeasonFilter,
    /// Extension restriction.
    pub extension: ExtensionFilter,
    /// Case-insensitive substring searched in title, group and URL.
    pub search: Option<String>,
    /// Drop entries already present in the library.
    pub hide_existing: bool,
}

impl EntryFilter {
    /// Returns true when the entry passes every restriction.
    #[must_use]
    pub fn matches(&self, entry: &PlaylistEntry, state: &EntryState) -> bool {
        if self.hide_existing && state.exists_locally {
            return false;
        }
        if !self.media.accepts(entry.media_type)
            || !self.group.accepts(&entry.group_label)
            || !self.season.accepts(entry.season())
            || !self.extension.accepts(&entry.file_extension)
        {
            return false;
        }
        match self.search.as_deref().map(str::trim) {
            Some(needle) if !needle.is_empty() => {
                entry.search_text().contains(&needle.to_lowercase())
            }
            _ => true,
        }
    }
}

/// Distinct filter values with entry counts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Facets {
    /// Non-blank group labels.
    pub groups: BTreeMap<String, usize>,
    /// Entries with a blank group label.
    pub ungrouped: usize,
    /// Season numbers.
    pub seasons: BTreeMap<u32, usize>,
    /// Entries without a season.
    pub no_season: usize,
    /// Non-empty extensions.
    pub extensions: BTreeMap<String, usize>,
    /// Entries without an extension.
    pub no_extension: usize,
}

impl Facets {
    /// Counts the facet values of `entries`.
    pub fn from_entries<'a>(entries: impl IntoIterator<Item = &'a PlaylistEntry>) -> Self {
        let mut facets = Self::default();
        for entry in entries {
            if entry.group_label.trim().is_empty() {
                facets.ungrouped += 1;
            } else {
                *facets.groups.entry(entry.group_label.clone()).or_default() += 1;
            }

            match entry.season() {
                Some(season) => *facets.seasons.entry(season).or_default() += 1,
                None => facets.no_season += 1,
            }

            if entry.file_extension.is_empty() {
                facets.no_extension += 1;
            } else {
                *facets
                    .extensions
                    .entry(entry.file_extension.to_lowercase())
                    .or_default() += 1;
            }
        }
        facets
    }
}
