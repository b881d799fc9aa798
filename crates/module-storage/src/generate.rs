//! Metadata generation and dependency resolution.
//!
//! At upload time the generator parses the package's module composition
//! and Module Dependency Reference Set, discards internal references, and
//! resolves every remaining row to a previously stored package by walking
//! the environment's read directory chain. An unresolved row fails the
//! upload: a package may not enter the store with dangling dependencies.

use std::collections::{BTreeSet, HashSet};
use std::fs::{self, File};
use std::io::{self, BufReader};
use std::path::Path;
use std::time::UNIX_EPOCH;

use module_storage_types::{
    well_known, ModuleDependencyRow, ModuleMetadata, StorageCoordinate, METADATA_FILE,
};

use crate::config::StorageConfiguration;
use crate::digest;
use crate::error::{StorageError, StorageResult};
use crate::matcher::MatchStrategy;
use crate::store::ResourceStore;

/// Filename suffix identifying stored package archives.
pub const PACKAGE_SUFFIX: &str = ".zip";

/// Builds the metadata record for a package being uploaded.
pub struct MetadataGenerator<'a, S: ResourceStore> {
    store: &'a S,
    config: &'a StorageConfiguration,
}

/// One external MDRS row awaiting resolution to a stored package.
struct PendingDependency {
    row: ModuleDependencyRow,
    metadata_path: Option<String>,
}

impl<'a, S: ResourceStore> MetadataGenerator<'a, S> {
    /// Creates a generator resolving against `store` through the read
    /// directories of `config`.
    pub fn new(store: &'a S, config: &'a StorageConfiguration) -> Self {
        Self { store, config }
    }

    /// Generates the metadata for `file` uploaded at `coordinate`.
    ///
    /// Fails with `OperationFailed` if the package contains no modules or
    /// its digest cannot be computed, and with `ResourceNotFound` if an
    /// external dependency cannot be resolved anywhere in the read chain.
    pub fn generate(
        &self,
        coordinate: &StorageCoordinate,
        file: &Path,
    ) -> StorageResult<ModuleMetadata> {
        let filename = package_filename(file)?;

        let composition = rf2_archive::unique_module_ids(open(file, &filename)?, false);
        if composition.is_empty() {
            return Err(StorageError::failed(format!(
                "package {filename} contains no modules"
            )));
        }

        let rows = rf2_archive::module_dependency_rows(open(file, &filename)?);
        let external: Vec<ModuleDependencyRow> = rows
            .into_iter()
            .filter(|row| !composition.contains(&row.referenced_component_id))
            .collect();

        let dependencies = if external.is_empty() {
            Vec::new()
        } else {
            self.resolve_dependencies(coordinate, &external, &composition)?
        };

        let file_md5 = digest::file_md5(file)
            .map_err(|e| StorageError::io("computing MD5 of", &filename, e))?;
        let file_time_stamp = modified_millis(file)
            .map_err(|e| StorageError::io("reading timestamp of", &filename, e))?;
        let effective_time: u32 = coordinate
            .effective_time()
            .parse()
            .map_err(|_| StorageError::invalid(format!(
                "effective time {} is not numeric",
                coordinate.effective_time()
            )))?;
        let edition = composition.contains(well_known::SNOMED_CT_MODEL_COMPONENT_MODULE);

        let mut metadata = ModuleMetadata {
            filename,
            code_system_short_name: coordinate.code_system().to_string(),
            identifying_module_id: coordinate.module_id().to_string(),
            composition_module_ids: composition.into_iter().collect(),
            effective_time,
            file_time_stamp,
            file_md5,
            published: false,
            edition,
            dependencies: Vec::new(),
        };
        metadata.set_dependencies(dependencies);

        tracing::info!(
            "generated metadata for {coordinate}: {} module(s), {} dependenc(ies), edition={}",
            metadata.composition_module_ids.len(),
            metadata.dependencies.len(),
            metadata.edition
        );
        Ok(metadata)
    }

    /// Resolves every external MDRS row to the metadata path of a stored
    /// package, then loads and deduplicates the resolved documents.
    fn resolve_dependencies(
        &self,
        coordinate: &StorageCoordinate,
        rows: &[ModuleDependencyRow],
        own_composition: &BTreeSet<String>,
    ) -> StorageResult<Vec<ModuleMetadata>> {
        let needed_times: HashSet<&str> = rows
            .iter()
            .filter_map(|row| row.target_effective_time.as_deref())
            .collect();
        let mut pending: Vec<PendingDependency> = rows
            .iter()
            .cloned()
            .map(|row| PendingDependency {
                row,
                metadata_path: None,
            })
            .collect();

        for directory in &self.config.read_directories {
            if pending.iter().all(|p| p.metadata_path.is_some()) {
                break;
            }
            tracing::debug!("scanning {directory} for dependency candidates");

            let package_paths = self
                .store
                .list_filenames(directory, PACKAGE_SUFFIX)
                .map_err(|e| StorageError::io("listing packages under", directory, e))?;

            for package_path in package_paths {
                if pending.iter().all(|p| p.metadata_path.is_some()) {
                    break;
                }
                let Some(candidate) = self.probe_candidate(&package_path, &needed_times)? else {
                    continue;
                };

                let metadata_path = sibling_metadata_path(&package_path);
                for dependency in pending.iter_mut().filter(|p| p.metadata_path.is_none()) {
                    if MatchStrategy::CompositionWithTime.matches(&candidate, &dependency.row) {
                        dependency.metadata_path = Some(metadata_path.clone());
                    }
                }
            }
        }

        if let Some(unresolved) = pending.iter().find(|p| p.metadata_path.is_none()) {
            let row = &unresolved.row;
            let target_time = row.target_effective_time.as_deref().unwrap_or("<any>");
            let expected: Vec<String> = self
                .config
                .read_directories
                .iter()
                .map(|directory| {
                    format!(
                        "{directory}/{}_{}/{target_time}/{METADATA_FILE}",
                        coordinate.code_system(),
                        row.referenced_component_id
                    )
                })
                .collect();
            return Err(StorageError::not_found(format!(
                "uploading {coordinate}: dependency on module {} at {} resolved nowhere, expected {}",
                row.referenced_component_id,
                target_time,
                expected.join(" or ")
            )));
        }

        let mut seen_paths = HashSet::new();
        let mut seen_coordinates = HashSet::new();
        let mut dependencies = Vec::new();
        for resolved in &pending {
            let Some(path) = &resolved.metadata_path else {
                continue;
            };
            if !seen_paths.insert(path.clone()) {
                continue;
            }

            let metadata = self.load_metadata(path)?;
            // A package never depends on one sharing its own modules.
            if metadata
                .composition_module_ids
                .iter()
                .any(|module| own_composition.contains(module))
            {
                continue;
            }
            let key = format!(
                "{}:{}:{}",
                metadata.code_system_short_name,
                metadata.identifying_module_id,
                metadata.effective_time
            );
            if seen_coordinates.insert(key) {
                dependencies.push(metadata);
            }
        }
        Ok(dependencies)
    }

    /// Downloads a narrowed candidate package and summarises it for
    /// matching. Candidates whose effective-time path segment is not
    /// needed, or whose path does not follow the storage layout, are
    /// skipped without download.
    fn probe_candidate(
        &self,
        package_path: &str,
        needed_times: &HashSet<&str>,
    ) -> StorageResult<Option<ModuleMetadata>> {
        let segments: Vec<&str> = package_path.split('/').collect();
        if segments.len() < 3 {
            return Ok(None);
        }
        let time_segment = segments[segments.len() - 2];
        if !needed_times.contains(time_segment) {
            return Ok(None);
        }
        let Ok(effective_time) = time_segment.parse::<u32>() else {
            return Ok(None);
        };
        let Some((code_system, module_id)) = segments[segments.len() - 3].rsplit_once('_') else {
            return Ok(None);
        };

        let local = self
            .store
            .read_file(package_path)
            .map_err(|e| StorageError::io("downloading candidate", package_path, e))?;
        let composition = rf2_archive::unique_module_ids(open(&local, package_path)?, false);

        Ok(Some(ModuleMetadata {
            filename: segments[segments.len() - 1].to_string(),
            code_system_short_name: code_system.to_string(),
            identifying_module_id: module_id.to_string(),
            composition_module_ids: composition.into_iter().collect(),
            effective_time,
            file_time_stamp: 0,
            file_md5: String::new(),
            published: false,
            edition: false,
            dependencies: Vec::new(),
        }))
    }

    /// Loads and deserializes a resolved dependency's metadata document.
    fn load_metadata(&self, path: &str) -> StorageResult<ModuleMetadata> {
        let local = self.store.read_file(path).map_err(|e| {
            if e.kind() == io::ErrorKind::NotFound {
                StorageError::not_found(path.to_string())
            } else {
                StorageError::io("reading", path, e)
            }
        })?;
        let file = File::open(&local).map_err(|e| StorageError::io("opening", path, e))?;
        serde_json::from_reader(BufReader::new(file))
            .map_err(|e| StorageError::failed(format!("malformed metadata at {path}: {e}")))
    }
}

/// The `metadata.json` stored next to a package file.
fn sibling_metadata_path(package_path: &str) -> String {
    match package_path.rsplit_once('/') {
        Some((directory, _)) => format!("{directory}/{METADATA_FILE}"),
        None => METADATA_FILE.to_string(),
    }
}

fn package_filename(file: &Path) -> StorageResult<String> {
    file.file_name()
        .and_then(|name| name.to_str())
        .map(str::to_string)
        .ok_or_else(|| {
            StorageError::invalid(format!("package path {} has no filename", file.display()))
        })
}

fn open(file: &Path, label: &str) -> StorageResult<File> {
    File::open(file).map_err(|e| StorageError::io("opening", label, e))
}

fn modified_millis(file: &Path) -> io::Result<i64> {
    let modified = fs::metadata(file)?.modified()?;
    let duration = modified.duration_since(UNIX_EPOCH).unwrap_or_default();
    Ok(duration.as_millis() as i64)
}
