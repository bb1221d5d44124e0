//! Parsed entries plus their mutable download state.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::debug;

use super::filter::{EntryFilter, Facets};
use super::index::ExistingIndex;
use super::planner::plan_target_path;
use crate::playlist::{EntryId, PlaylistEntry};

/// Lifecycle of one entry in the catalog.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "detail", rename_all = "snake_case")]
pub enum EntryStatus {
    /// Nothing has happened yet.
    #[default]
    Idle,
    /// The planned file is already in the library.
    AlreadyPresent,
    /// Queued in a running batch, transfer not started.
    Preparing,
    /// Transfer running; carries the latest status line.
    Downloading(String),
    /// Transfer finished.
    Completed,
    /// Transfer failed with this message.
    Failed(String),
    /// Transfer stopped by cancellation.
    Cancelled,
}

impl fmt::Display for EntryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => Ok(()),
            Self::AlreadyPresent => f.write_str("Already present"),
            Self::Preparing => f.write_str("Preparing..."),
            Self::Downloading(status) => f.write_str(status),
            Self::Completed => f.write_str("Done"),
            Self::Failed(message) => write!(f, "Error: {message}"),
            Self::Cancelled => f.write_str("Cancelled"),
        }
    }
}

/// Mutable state kept beside each immutable [`PlaylistEntry`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct EntryState {
    /// Planned destination; `None` until a library root is attached or for
    /// entries that are never downloaded.
    pub target_path: Option<PathBuf>,
    /// Whether the planned destination is already in the library.
    pub exists_locally: bool,
    /// Current lifecycle status.
    pub status: EntryStatus,
    /// Whether the entry is selected for download.
    pub selected: bool,
}

/// Entries of one parsed playlist and their state, keyed by [`EntryId`].
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    entries: Vec<PlaylistEntry>,
    states: Vec<EntryState>,
    root: Option<PathBuf>,
    index: ExistingIndex,
}

impl Catalog {
    /// Wraps parser output with fresh state.
    #[must_use]
    pub fn new(entries: Vec<PlaylistEntry>) -> Self {
        let states = vec![EntryState::default(); entries.len()];
        Self {
            entries,
            states,
            root: None,
            index: ExistingIndex::new(),
        }
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true when the catalog holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// All entries in parser order.
    #[must_use]
    pub fn entries(&self) -> &[PlaylistEntry] {
        &self.entries
    }

    /// Library root, once attached.
    #[must_use]
    pub fn root(&self) -> Option<&Path> {
        self.root.as_deref()
    }

    /// Existing-file index of the attached library.
    #[must_use]
    pub fn index(&self) -> &ExistingIndex {
        &self.index
    }

    /// Looks up an entry.
    #[must_use]
    pub fn entry(&self, id: EntryId) -> Option<&PlaylistEntry> {
        self.position(id).map(|pos| &self.entries[pos])
    }

    /// Looks up an entry's state.
    #[must_use]
    pub fn state(&self, id: EntryId) -> Option<&EntryState> {
        self.position(id).map(|pos| &self.states[pos])
    }

    /// Looks up an entry's state for mutation.
    pub fn state_mut(&mut self, id: EntryId) -> Option<&mut EntryState> {
        self.position(id).map(|pos| &mut self.states[pos])
    }

    /// Entries paired with their state, in parser order.
    pub fn iter(&self) -> impl Iterator<Item = (&PlaylistEntry, &EntryState)> {
        self.entries.iter().zip(self.states.iter())
    }

    /// Entries accepted by `filter`.
    pub fn filtered<'a>(
        &'a self,
        filter: &'a EntryFilter,
    ) -> impl Iterator<Item = (&'a PlaylistEntry, &'a EntryState)> + 'a {
        self.iter()
            .filter(move |(entry, state)| filter.matches(entry, state))
    }

    /// Distinct filter values over every entry.
    #[must_use]
    pub fn facets(&self) -> Facets {
        Facets::from_entries(&self.entries)
    }

    /// Attaches a library root and its index, then recomputes targets.
    pub fn attach_library(&mut self, root: &Path, index: ExistingIndex) {
        self.root = Some(root.to_path_buf());
        self.index = index;
        self.refresh_targets();
    }

    /// Recomputes target paths and presence for every entry.
    ///
    /// Only movies and episodes get a target. Without a root every target
    /// is cleared. An [`EntryStatus::AlreadyPresent`] status that no longer
    /// holds reverts to [`EntryStatus::Idle`]; other statuses are kept.
    pub fn refresh_targets(&mut self) {
        let mut present = 0usize;
        for (entry, state) in self.entries.iter().zip(self.states.iter_mut()) {
            let target = self
                .root
                .as_deref()
                .filter(|_| entry.media_type.is_downloadable())
                .map(|root| plan_target_path(entry, root));

            let exists = target
                .as_deref()
                .is_some_and(|path| self.index.contains(path));

            state.target_path = target;
            state.exists_locally = exists;
            if exists {
                state.status = EntryStatus::AlreadyPresent;
                present += 1;
            } else if state.status == EntryStatus::AlreadyPresent {
                state.status = EntryStatus::Idle;
            }
        }
        debug!(entries = self.entries.len(), present, "targets refreshed");
    }

    /// Sets the selection flag of one entry. Returns false for an unknown id.
    pub fn set_selected(&mut self, id: EntryId, selected: bool) -> bool {
        match self.state_mut(id) {
            Some(state) => {
                state.selected = selected;
                true
            }
            None => false,
        }
    }

    /// Selects every entry accepted by `filter`. Returns how many matched.
    pub fn select_matching(&mut self, filter: &EntryFilter) -> usize {
        let mut matched = 0;
        for (entry, state) in self.entries.iter().zip(self.states.iter_mut()) {
            if filter.matches(entry, state) {
                state.selected = true;
                matched += 1;
            }
        }
        matched
    }

    /// Clears every selection flag.
    pub fn clear_selection(&mut self) {
        for state in &mut self.states {
            state.selected = false;
        }
    }

    /// Selected entry ids in parser order.
    #[must_use]
    pub fn selected_ids(&self) -> Vec<EntryId> {
        self.iter()
            .filter(|(_, state)| state.selected)
            .map(|(entry, _)| entry.id)
            .collect()
    }

    /// Records a finished download at `path`.
    pub fn mark_completed(&mut self, id: EntryId, path: &Path) {
        self.index.insert(path);
        if let Some(state) = self.state_mut(id) {
            state.target_path = Some(path.to_path_buf());
            state.exists_locally = true;
            state.status = EntryStatus::Completed;
        }
    }

    fn position(&self, id: EntryId) -> Option<usize> {
        // Parser ids equal positions; fall back to a scan for hand-built catalogs.
        match self.entries.get(id.0) {
            Some(entry) if entry.id == id => Some(id.0),
            _ => self.entries.iter().position(|entry| entry.id == id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::library::TypeFilter;
    use crate::playlist::MediaType;

    fn entry(id: usize, media_type: MediaType, title: &str) -> PlaylistEntry {
        PlaylistEntry {
            id: EntryId(id),
            media_type,
            group_label: "Films".to_string(),
            title: title.to_string(),
            season_episode: None,
            logo_url: None,
            file_extension: ".mkv".to_string(),
            source_url: format!("http://h/movie/{id}.mkv"),
        }
    }

    fn catalog() -> Catalog {
        Catalog::new(vec![
            entry(0, MediaType::Movie, "Heat"),
            entry(1, MediaType::Movie, "Alien"),
            entry(2, MediaType::Other, "Clip"),
        ])
    }

    #[test]
    fn test_attach_library_plans_only_downloadable_entries() {
        let mut catalog = catalog();
        catalog.attach_library(Path::new("/lib"), ExistingIndex::new());

        assert_eq!(
            catalog.state(EntryId(0)).and_then(|s| s.target_path.clone()),
            Some(PathBuf::from("/lib/Films/Films/Heat.mkv"))
        );
        assert_eq!(
            catalog.state(EntryId(2)).and_then(|s| s.target_path.clone()),
            None
        );
    }

    #[test]
    fn test_attach_library_marks_present_entries() {
        let mut index = ExistingIndex::new();
        index.insert(Path::new("/lib/Films/Films/HEAT.mkv"));
        let mut catalog = catalog();
        catalog.attach_library(Path::new("/lib"), index);

        let heat = catalog.state(EntryId(0)).cloned().unwrap_or_default();
        assert!(heat.exists_locally);
        assert_eq!(heat.status, EntryStatus::AlreadyPresent);
        let alien = catalog.state(EntryId(1)).cloned().unwrap_or_default();
        assert!(!alien.exists_locally);
        assert_eq!(alien.status, EntryStatus::Idle);
    }

    #[test]
    fn test_refresh_reverts_stale_already_present_only() {
        let mut index = ExistingIndex::new();
        index.insert(Path::new("/lib/Films/Films/Heat.mkv"));
        let mut catalog = catalog();
        catalog.attach_library(Path::new("/lib"), index);
        if let Some(state) = catalog.state_mut(EntryId(1)) {
            state.status = EntryStatus::Failed("boom".to_string());
        }

        catalog.attach_library(Path::new("/other"), ExistingIndex::new());
        assert_eq!(
            catalog.state(EntryId(0)).map(|s| s.status.clone()),
            Some(EntryStatus::Idle)
        );
        assert_eq!(
            catalog.state(EntryId(1)).map(|s| s.status.clone()),
            Some(EntryStatus::Failed("boom".to_string()))
        );
    }

    #[test]
    fn test_selection_round_trip() {
        let mut catalog = catalog();
        assert!(catalog.set_selected(EntryId(1), true));
        assert!(!catalog.set_selected(EntryId(9), true));
        assert_eq!(catalog.selected_ids(), vec![EntryId(1)]);

        let filter = EntryFilter {
            media: TypeFilter::Movies,
            ..EntryFilter::default()
        };
        assert_eq!(catalog.select_matching(&filter), 2);
        assert_eq!(catalog.selected_ids(), vec![EntryId(0), EntryId(1)]);

        catalog.clear_selection();
        assert!(catalog.selected_ids().is_empty());
    }

    #[test]
    fn test_mark_completed_updates_state_and_index() {
        let mut catalog = catalog();
        let path = Path::new("/lib/Films/Films/Alien.mkv");
        catalog.mark_completed(EntryId(1), path);

        let state = catalog.state(EntryId(1)).cloned().unwrap_or_default();
        assert_eq!(state.status, EntryStatus::Completed);
        assert!(state.exists_locally);
        assert!(catalog.index().contains(path));
    }

    #[test]
    fn test_lookup_by_id_when_ids_are_not_positions() {
        let catalog = Catalog::new(vec![entry(7, MediaType::Movie, "Heat")]);
        assert_eq!(catalog.entry(EntryId(7)).map(|e| e.title.as_str()), Some("Heat"));
        assert!(catalog.entry(EntryId(0)).is_none());
    }

    #[test]
    fn test_entry_status_display() {
        assert_eq!(EntryStatus::Idle.to_string(), "");
        assert_eq!(
            EntryStatus::Failed("HTTP 404".to_string()).to_string(),
            "Error: HTTP 404"
        );
        assert_eq!(EntryStatus::Completed.to_string(), "Done");
    }
}
