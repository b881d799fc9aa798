//! Storage coordinates and resource path construction.
//!
//! Every stored release package is addressed by the triple
//! (code system short name, identifying module id, effective time). The
//! triple maps deterministically onto a resource path
//! `{directory}/{codeSystem}_{moduleId}/{effectiveTime}/` holding exactly
//! `metadata.json` and the original archive file. The same path functions
//! are used by upload, fetch, archive, and listing logic.

use std::fmt;

use thiserror::Error;

/// Filename of the metadata document stored alongside each package.
pub const METADATA_FILE: &str = "metadata.json";

/// Path segment under which archived package versions are filed.
const ARCHIVE_SEGMENT: &str = "archive";

/// Errors raised when constructing a [`StorageCoordinate`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InvalidCoordinate {
    /// The code system short name was empty or whitespace.
    #[error("code system short name must not be blank")]
    BlankCodeSystem,

    /// The identifying module id was empty or whitespace.
    #[error("identifying module id must not be blank")]
    BlankModuleId,

    /// The effective time was not exactly 8 ASCII digits.
    #[error("effective time '{value}' must be an 8-digit date (YYYYMMDD)")]
    BadEffectiveTime {
        /// The rejected value.
        value: String,
    },
}

/// Returns true if `value` is exactly 8 ASCII digits.
///
/// This is the only validity check applied to effective times; no
/// calendar check is performed.
pub fn is_effective_time(value: &str) -> bool {
    value.len() == 8 && value.chars().all(|c| c.is_ascii_digit())
}

/// The validated (code system, module, effective time) address of a
/// stored release package.
///
/// Construction rejects blank components and malformed effective times,
/// so a coordinate in hand is always safe to turn into resource paths.
///
/// # Examples
///
/// ```
/// use module_storage_types::StorageCoordinate;
///
/// let coordinate = StorageCoordinate::new("SNOMEDCT", "900000000000207008", "20240101").unwrap();
/// assert_eq!(
///     coordinate.metadata_path("prod"),
///     "prod/SNOMEDCT_900000000000207008/20240101/metadata.json"
/// );
///
/// assert!(StorageCoordinate::new("SNOMEDCT", "900000000000207008", "2024").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StorageCoordinate {
    code_system: String,
    module_id: String,
    effective_time: String,
}

impl StorageCoordinate {
    /// Creates a coordinate, validating all three components.
    pub fn new(
        code_system: &str,
        module_id: &str,
        effective_time: &str,
    ) -> Result<Self, InvalidCoordinate> {
        if code_system.trim().is_empty() {
            return Err(InvalidCoordinate::BlankCodeSystem);
        }
        if module_id.trim().is_empty() {
            return Err(InvalidCoordinate::BlankModuleId);
        }
        if !is_effective_time(effective_time) {
            return Err(InvalidCoordinate::BadEffectiveTime {
                value: effective_time.to_string(),
            });
        }
        Ok(Self {
            code_system: code_system.to_string(),
            module_id: module_id.to_string(),
            effective_time: effective_time.to_string(),
        })
    }

    /// The code system short name, e.g. `SNOMEDCT-US`.
    pub fn code_system(&self) -> &str {
        &self.code_system
    }

    /// The identifying module id the package is filed under.
    pub fn module_id(&self) -> &str {
        &self.module_id
    }

    /// The 8-digit effective time.
    pub fn effective_time(&self) -> &str {
        &self.effective_time
    }

    /// Directory holding every version of this code system/module pair:
    /// `{directory}/{codeSystem}_{moduleId}/`.
    pub fn module_directory(&self, directory: &str) -> String {
        format!("{}/{}_{}/", directory, self.code_system, self.module_id)
    }

    /// Directory holding this release version:
    /// `{directory}/{codeSystem}_{moduleId}/{effectiveTime}/`.
    pub fn release_directory(&self, directory: &str) -> String {
        format!("{}{}/", self.module_directory(directory), self.effective_time)
    }

    /// Path of the `metadata.json` document for this coordinate.
    pub fn metadata_path(&self, directory: &str) -> String {
        format!("{}{}", self.release_directory(directory), METADATA_FILE)
    }

    /// Path of the package archive file for this coordinate.
    pub fn package_path(&self, directory: &str, filename: &str) -> String {
        format!("{}{}", self.release_directory(directory), filename)
    }

    /// Rewrites a resource path under this coordinate to its archive
    /// location, replacing the effective-time path segment with
    /// `archive/{epochSeconds}`.
    ///
    /// Both the metadata and the package path of one archival operation
    /// must be rewritten with the same epoch timestamp so they land in
    /// the same archive directory.
    pub fn archived_path(&self, original: &str, epoch_seconds: u64) -> String {
        original.replacen(
            &format!("/{}/", self.effective_time),
            &format!("/{}/{}/", ARCHIVE_SEGMENT, epoch_seconds),
            1,
        )
    }
}

impl fmt::Display for StorageCoordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}/{}",
            self.code_system, self.module_id, self.effective_time
        )
    }
}
