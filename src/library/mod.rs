//! Local library: destination planning, existing-file index, catalog state
//! and view filters.

pub mod catalog;
pub mod filter;
pub mod index;
pub mod planner;

pub use catalog::{Catalog, EntryState, EntryStatus};
pub use filter::{
    EntryFilter, ExtensionFilter, Facets, FilterParseError, GroupFilter, SeasonFilter, TypeFilter,
};
pub use index::{ExistingIndex, build_index, normalize_path};
pub use planner::{plan_target_path, sanitize_file_name, sanitize_folder_name};
