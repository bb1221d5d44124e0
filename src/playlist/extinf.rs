//! `#EXTINF` metadata line reader.

use std::sync::LazyLock;

use regex::Regex;

/// Marker that opens a metadata line.
pub const EXTINF_MARKER: &str = "#EXTINF:";

/// Title used when a line carries neither `tvg-name` nor trailing text.
pub const UNTITLED: &str = "Untitled";

#[allow(clippy::expect_used)]
static GROUP_TITLE_ATTR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)group-title="([^"]*)""#).expect("group-title regex is valid")
});

#[allow(clippy::expect_used)]
static TVG_NAME_ATTR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?i)tvg-name="([^"]*)""#).expect("tvg-name regex is valid"));

#[allow(clippy::expect_used)]
static TVG_LOGO_ATTR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?i)tvg-logo="([^"]*)""#).expect("tvg-logo regex is valid"));

/// Fields read from one metadata line.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ExtInf {
    /// `group-title` attribute, empty when absent.
    pub group: String,
    /// Display title after title precedence has been applied.
    pub title: String,
    /// `tvg-logo` attribute when present and non-blank.
    pub logo: Option<String>,
}

/// Returns true when `line` opens with the `#EXTINF:` marker (any case).
#[must_use]
pub fn is_extinf(line: &str) -> bool {
    line.get(..EXTINF_MARKER.len())
        .is_some_and(|head| head.eq_ignore_ascii_case(EXTINF_MARKER))
}

/// Reads group, title and logo from a metadata line.
///
/// Title precedence: `tvg-name` → text after the last comma → [`UNTITLED`].
#[must_use]
pub fn parse_extinf(line: &str) -> ExtInf {
    let group = attribute(&GROUP_TITLE_ATTR, line).unwrap_or_default();
    let tvg_name = attribute(&TVG_NAME_ATTR, line).unwrap_or_default();
    let logo = attribute(&TVG_LOGO_ATTR, line).filter(|logo| !logo.trim().is_empty());

    let trailing = line
        .rfind(',')
        .map(|idx| line[idx + 1..].trim())
        .unwrap_or_default();

    let title = [tvg_name.trim(), trailing]
        .into_iter()
        .find(|candidate| !candidate.is_empty())
        .unwrap_or(UNTITLED)
        .to_string();

    ExtInf { group, title, logo }
}

fn attribute(pattern: &Regex, line: &str) -> Option<String> {
    pattern
        .captures(line)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}
