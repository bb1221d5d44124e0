//! Entry classification heuristics.
//!
//! Classification works on whatever the playlist line carries: the title,
//! the group label and the source URL. Nothing is fetched. Inputs are often
//! inconsistent, so every rule falls through to the next instead of failing.

use std::fmt;
use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;
use url::Url;

/// `S01E02`, `s1 e2`, ...
#[allow(clippy::expect_used)]
static SEASON_EPISODE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\bS(\d{1,2})\s*E(\d{1,3})\b").expect("season/episode regex is valid")
});

/// `1x02`, `12x103`, ...
#[allow(clippy::expect_used)]
static CROSS_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(\d{1,2})x(\d{1,3})\b").expect("NxM regex is valid")
});

#[allow(clippy::expect_used)]
static SERIES_WORD_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(saison|season|episodes|épisode|episode)\b")
        .expect("series keyword regex is valid")
});

#[allow(clippy::expect_used)]
static VIDEO_EXTENSION_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\.(mkv|mp4|avi|mov|wmv|m4v)\b").expect("video extension regex is valid")
});

/// Group label prefixes rejected during parsing (regional/language tags).
pub const DEFAULT_EXCLUDED_GROUP_PREFIXES: &[&str] = &[
    "AR:",
    "ES:",
    "EN:",
    "IT:",
    "ALBANIA",
    "BELGIUM",
    "Films VOST",
    "Séries ARABES",
    "Séries SUB-AR",
    "Séries TURQUES",
    "DZ:",
];

/// Group labels that denote continuous streams.
pub const DEFAULT_LIVE_GROUPS: &[&str] = &[
    "news",
    "sport",
    "sports",
    "tv",
    "live",
    "documentary",
    "kids",
    "music",
];

/// Kind of media a playlist entry points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaType {
    /// A standalone film.
    Movie,
    /// One episode of a series.
    Episode,
    /// A continuous stream; never emitted by the parser.
    Live,
    /// A downloadable file that is neither a movie nor an episode.
    Other,
}

impl MediaType {
    /// Returns true for the types the batch orchestrator downloads.
    #[must_use]
    pub fn is_downloadable(self) -> bool {
        matches!(self, Self::Movie | Self::Episode)
    }

    /// Stable lower-case label.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Movie => "movie",
            Self::Episode => "episode",
            Self::Live => "live",
            Self::Other => "other",
        }
    }
}

impl fmt::Display for MediaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A season/episode pair. Both numbers are always known together.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct SeasonEpisode {
    /// Season number as written in the title.
    pub season: u32,
    /// Episode number as written in the title.
    pub episode: u32,
}

/// Exclusion lists applied while parsing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassifierRules {
    excluded_group_prefixes: Vec<String>,
    live_groups: Vec<String>,
}

impl Default for ClassifierRules {
    fn default() -> Self {
        Self::new(
            DEFAULT_EXCLUDED_GROUP_PREFIXES.iter().copied(),
            DEFAULT_LIVE_GROUPS.iter().copied(),
        )
    }
}

impl ClassifierRules {
    /// Creates rules from explicit lists. Matching is case-insensitive.
    pub fn new<P, L>(
        excluded_group_prefixes: impl IntoIterator<Item = P>,
        live_groups: impl IntoIterator<Item = L>,
    ) -> Self
    where
        P: AsRef<str>,
        L: AsRef<str>,
    {
        Self {
            excluded_group_prefixes: excluded_group_prefixes
                .into_iter()
                .map(|p| p.as_ref().to_lowercase())
                .filter(|p| !p.is_empty())
                .collect(),
            live_groups: live_groups
                .into_iter()
                .map(|g| g.as_ref().trim().to_lowercase())
                .collect(),
        }
    }

    /// Replaces the excluded prefix list, keeping the live groups.
    #[must_use]
    pub fn with_excluded_group_prefixes<P: AsRef<str>>(
        self,
        prefixes: impl IntoIterator<Item = P>,
    ) -> Self {
        Self::new(prefixes, self.live_groups)
    }

    /// Replaces the live group list, keeping the excluded prefixes.
    #[must_use]
    pub fn with_live_groups<L: AsRef<str>>(self, groups: impl IntoIterator<Item = L>) -> Self {
        Self::new(self.excluded_group_prefixes, groups)
    }

    /// Returns true when the group label starts with an excluded prefix.
    #[must_use]
    pub fn is_excluded_group(&self, group: &str) -> bool {
        if group.trim().is_empty() {
            return false;
        }
        let lowered = group.to_lowercase();
        self.excluded_group_prefixes
            .iter()
            .any(|prefix| lowered.starts_with(prefix.as_str()))
    }

    /// Returns true when the trimmed group label is a live category.
    #[must_use]
    pub fn is_live_group(&self, group: &str) -> bool {
        let lowered = group.trim().to_lowercase();
        !lowered.is_empty() && self.live_groups.iter().any(|g| *g == lowered)
    }

    /// Classifies an entry from its title, group label and URL.
    ///
    /// Order: episode markers, then movie markers, then live markers, then
    /// [`MediaType::Other`].
    #[must_use]
    pub fn classify(
        &self,
        title: &str,
        group: &str,
        url: &str,
        season_episode: Option<SeasonEpisode>,
    ) -> MediaType {
        let haystack = format!("{title} {group} {url}").to_lowercase();

        if season_episode.is_some()
            || haystack.contains("/series/")
            || SERIES_WORD_PATTERN.is_match(&haystack)
        {
            return MediaType::Episode;
        }

        if haystack.contains("/movie/") || VIDEO_EXTENSION_PATTERN.is_match(&haystack) {
            return MediaType::Movie;
        }

        if self.is_live_group(group) || extension_from_url(url).is_empty() {
            return MediaType::Live;
        }

        MediaType::Other
    }
}

/// Finds a season/episode pair in a title.
///
/// `SxxEyy` wins over `NxM` when both are present.
#[must_use]
pub fn season_episode(title: &str) -> Option<SeasonEpisode> {
    [&*SEASON_EPISODE_PATTERN, &*CROSS_PATTERN]
        .into_iter()
        .find_map(|pattern| {
            let caps = pattern.captures(title)?;
            let season = caps.get(1)?.as_str().parse().ok()?;
            let episode = caps.get(2)?.as_str().parse().ok()?;
            Some(SeasonEpisode { season, episode })
        })
}

/// Returns the part of an episode title before its season/episode marker.
///
/// `"Lupin - S01E05"` gives `"Lupin"`. Falls back to the whole trimmed title
/// when there is no marker or nothing precedes it.
#[must_use]
pub fn series_name(title: &str) -> &str {
    let marker_start = [&*SEASON_EPISODE_PATTERN, &*CROSS_PATTERN]
        .into_iter()
        .find_map(|pattern| pattern.find(title))
        .map(|m| m.start());

    let name = marker_start.map_or("", |start| {
        title[..start].trim_end_matches(|c: char| c.is_whitespace() || "-_.:|".contains(c))
    });
    if name.trim().is_empty() {
        title.trim()
    } else {
        name.trim()
    }
}

/// Extracts the lower-case file extension (with leading dot) of a URL path.
///
/// Falls back to treating the raw string as a path when it is not a valid
/// absolute URL. Returns an empty string when no extension exists.
#[must_use]
pub fn extension_from_url(url: &str) -> String {
    let extension = match Url::parse(url) {
        Ok(parsed) => path_extension(parsed.path()),
        Err(_) => path_extension(url),
    };
    extension.map_or_else(String::new, |ext| format!(".{}", ext.to_lowercase()))
}

fn path_extension(path: &str) -> Option<String> {
    Path::new(path)
        .extension()
        .map(|ext| ext.to_string_lossy().into_owned())
        .filter(|ext| !ext.is_empty())
}
