//! Destination layout for downloaded entries.
//!
//! ```text
//! <root>/Films/<group>/<title><ext>
//! <root>/Series/<group>/<series>/S01/E05<ext>
//! <root>/Series/<group>/<series>/<title><ext>     (no season/episode)
//! <root>/Autre/<group>/<title><ext>
//! ```

use std::path::{Path, PathBuf};

use crate::playlist::{MediaType, PlaylistEntry, series_name};

/// Type folder for movies.
pub const FILMS_DIR: &str = "Films";
/// Type folder for episodes.
pub const SERIES_DIR: &str = "Series";
/// Type folder for everything else.
pub const OTHER_DIR: &str = "Autre";
/// Every type folder, in index enumeration order.
pub const LIBRARY_DIRS: [&str; 3] = [FILMS_DIR, SERIES_DIR, OTHER_DIR];

/// Replacement for an empty folder name.
pub const FOLDER_PLACEHOLDER: &str = "Divers";
/// Replacement for an empty file name.
pub const FILE_PLACEHOLDER: &str = "SansTitre";
/// Extension used when the URL has none.
pub const DEFAULT_EXTENSION: &str = ".bin";

/// Type folder for a media type.
#[must_use]
pub fn type_folder(media_type: MediaType) -> &'static str {
    match media_type {
        MediaType::Movie => FILMS_DIR,
        MediaType::Episode => SERIES_DIR,
        MediaType::Live | MediaType::Other => OTHER_DIR,
    }
}

/// Maps an entry to its destination under `root`. Pure; touches no files.
#[must_use]
pub fn plan_target_path(entry: &PlaylistEntry, root: &Path) -> PathBuf {
    let group_folder = sanitize_folder_name(&entry.group_label);
    let extension = if entry.file_extension.is_empty() {
        DEFAULT_EXTENSION
    } else {
        entry.file_extension.as_str()
    };

    let base = root.join(type_folder(entry.media_type)).join(group_folder);

    if entry.media_type != MediaType::Episode {
        return base.join(format!("{}{extension}", sanitize_file_name(&entry.title)));
    }

    let series_dir = base.join(sanitize_folder_name(series_name(&entry.title)));
    match entry.season_episode {
        Some(se) => series_dir
            .join(format!("S{:02}", se.season))
            .join(format!("E{:02}{extension}", se.episode)),
        None => series_dir.join(format!("{}{extension}", sanitize_file_name(&entry.title))),
    }
}

/// Makes a folder name safe: invalid characters become `_`, whitespace runs
/// collapse to one space, and an empty result becomes [`FOLDER_PLACEHOLDER`].
#[must_use]
pub fn sanitize_folder_name(name: &str) -> String {
    let replaced = replace_invalid(name);
    let collapsed = replaced.split_whitespace().collect::<Vec<_>>().join(" ");
    finish(collapsed, FOLDER_PLACEHOLDER)
}

/// Makes a file name safe: invalid characters become `_`, surrounding
/// whitespace is trimmed, and an empty result becomes [`FILE_PLACEHOLDER`].
#[must_use]
pub fn sanitize_file_name(name: &str) -> String {
    let replaced = replace_invalid(name);
    finish(replaced.trim().to_string(), FILE_PLACEHOLDER)
}

fn replace_invalid(name: &str) -> String {
    name.chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect()
}

// "." and ".." would escape or alias the parent directory.
fn finish(name: String, placeholder: &str) -> String {
    if name.is_empty() || name.chars().all(|c| c == '.') {
        placeholder.to_string()
    } else {
        name
    }
}
