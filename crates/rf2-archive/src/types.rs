//! Entry selection and parser-internal error types.

use thiserror::Error;

/// Filename prefixes identifying RF2 text files inside a release archive.
pub const RF2_FILE_PREFIXES: &[&str] = &["der2_", "sct2_", "xder2_", "xsct2_", "rel2_"];

/// Internal errors raised while reading an archive.
///
/// These never escape the crate's public operations: extraction degrades
/// to an empty result set and logs the error instead.
#[derive(Error, Debug)]
pub enum ArchiveError {
    /// I/O error reading the archive stream.
    #[error("IO error reading RF2 archive: {0}")]
    Io(#[from] std::io::Error),

    /// The stream is not a readable zip archive.
    #[error("zip format error: {0}")]
    Zip(#[from] zip::result::ZipError),

    /// Tab-separated decoding error.
    #[error("TSV parsing error: {0}")]
    Csv(#[from] csv::Error),
}

/// Selects which archive entries qualify for extraction.
///
/// An entry qualifies when its filename starts with one of
/// [`RF2_FILE_PREFIXES`], its path places it under a `Snapshot` folder
/// (unless all folders are scanned), and its filename contains the
/// optional substring filter.
///
/// # Examples
///
/// ```
/// use rf2_archive::EntryFilter;
///
/// let filter = EntryFilter::all_folders().matching("ModuleDependency");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryFilter {
    snapshot_only: bool,
    filename_contains: Option<String>,
}

impl EntryFilter {
    /// Qualifies RF2 entries under `Snapshot` folders only.
    pub fn snapshot() -> Self {
        Self {
            snapshot_only: true,
            filename_contains: None,
        }
    }

    /// Qualifies RF2 entries regardless of folder placement.
    pub fn all_folders() -> Self {
        Self {
            snapshot_only: false,
            filename_contains: None,
        }
    }

    /// Additionally requires the entry filename to contain `substring`.
    pub fn matching(mut self, substring: &str) -> Self {
        self.filename_contains = Some(substring.to_string());
        self
    }

    /// Returns true if the zip entry path qualifies for extraction.
    pub fn qualifies(&self, entry_path: &str) -> bool {
        if self.snapshot_only && !entry_path.contains("Snapshot/") {
            return false;
        }

        let filename = entry_path.rsplit('/').next().unwrap_or(entry_path);
        if !RF2_FILE_PREFIXES.iter().any(|p| filename.starts_with(p)) {
            return false;
        }

        match &self.filename_contains {
            Some(substring) => filename.contains(substring.as_str()),
            None => true,
        }
    }
}
