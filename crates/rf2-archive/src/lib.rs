//! # rf2-archive
//!
//! Column extraction from zipped SNOMED CT RF2 release archives.
//!
//! An RF2 release is a zip archive of tab-separated text files. This crate
//! streams such an archive, selects the text entries that follow the RF2
//! naming convention, and projects out requested columns, either
//! generically ([`extract_columns`]) or through the derived operations
//! used by the storage engine ([`unique_module_ids`],
//! [`module_dependency_rows`], [`latest_module_versions`]).
//!
//! Extraction never fails: a truncated or non-zip stream yields an empty
//! result set (logged at `warn`). Callers must treat "no rows" as a
//! signal to run their own validation.
//!
//! ## Features
//!
//! - `parallel` (default): project lines of each entry with rayon.
//!   Without it, entries are decoded sequentially via csv.

#![warn(missing_docs)]

mod archive;
mod types;

pub use archive::{
    columns, extract_columns, latest_module_versions, module_dependency_rows, unique_module_ids,
};
pub use types::{ArchiveError, EntryFilter, RF2_FILE_PREFIXES};

// Re-export the row type for convenience
pub use module_storage_types::ModuleDependencyRow;
