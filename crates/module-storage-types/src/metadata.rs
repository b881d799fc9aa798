//! Release package metadata.
//!
//! `ModuleMetadata` is the persisted description of one stored release
//! package and maps one-to-one onto the `metadata.json` document written
//! next to the package archive. File content is deliberately not part of
//! the value: callers that need bytes receive a [`ResolvedPackage`]
//! wrapper instead, so equality and serialization of the metadata never
//! have to special-case a transient field.

use std::path::PathBuf;

use crate::{InvalidCoordinate, StorageCoordinate};

/// Metadata describing one stored RF2 release package.
///
/// `dependencies` holds the metadata of every directly depended-upon
/// package, file-less, ordered ascending by effective time. A package
/// never depends on itself: no dependency's composition overlaps this
/// package's own `composition_module_ids`.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct ModuleMetadata {
    /// Original filename of the uploaded archive.
    pub filename: String,
    /// Code system short name the package belongs to, e.g. `SNOMEDCT`.
    pub code_system_short_name: String,
    /// The module this package is filed under.
    pub identifying_module_id: String,
    /// All module ids actually present in the package.
    pub composition_module_ids: Vec<String>,
    /// Release date of the package as an 8-digit integer, e.g. `20240101`.
    pub effective_time: u32,
    /// Modification time of the uploaded file, epoch milliseconds.
    pub file_time_stamp: i64,
    /// Lowercase hex MD5 digest of the package bytes.
    #[cfg_attr(feature = "serde", serde(rename = "fileMD5"))]
    pub file_md5: String,
    /// Whether the package has been marked as published.
    #[cfg_attr(feature = "serde", serde(default))]
    pub published: bool,
    /// Whether the package is an edition (composition includes the model
    /// component module) rather than an extension.
    #[cfg_attr(feature = "serde", serde(default))]
    pub edition: bool,
    /// Directly depended-upon packages, ascending by effective time.
    #[cfg_attr(feature = "serde", serde(default))]
    pub dependencies: Vec<ModuleMetadata>,
}

impl ModuleMetadata {
    /// Returns true if `module_id` is part of this package's composition.
    pub fn composition_contains(&self, module_id: &str) -> bool {
        self.composition_module_ids.iter().any(|m| m == module_id)
    }

    /// Replaces the dependency list, restoring the ascending
    /// effective-time order invariant.
    pub fn set_dependencies(&mut self, mut dependencies: Vec<ModuleMetadata>) {
        dependencies.sort_by_key(|d| d.effective_time);
        self.dependencies = dependencies;
    }

    /// The storage coordinate this metadata is filed under.
    pub fn coordinate(&self) -> Result<StorageCoordinate, InvalidCoordinate> {
        StorageCoordinate::new(
            &self.code_system_short_name,
            &self.identifying_module_id,
            &self.effective_time.to_string(),
        )
    }
}

/// A fetched release package: its metadata plus, when requested, a local
/// handle to the package bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPackage {
    /// The package's stored metadata.
    pub metadata: ModuleMetadata,
    /// Local file holding the package bytes, if the caller asked for them.
    pub file: Option<PathBuf>,
}
