//! Storage coordination: upload, fetch, archive, and metadata updates.
//!
//! The coordinator operates over one write directory and an ordered chain
//! of read directories, with an optional local-disk cache validated by
//! MD5 on every hit. Cache maintenance is never authoritative: its
//! failures are logged and ignored, and a stale entry is corrected on the
//! next read.

use std::collections::HashSet;
use std::fs::File;
use std::io::{BufReader, Write};
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

use module_storage_types::{ModuleMetadata, ResolvedPackage, StorageCoordinate};
use tempfile::NamedTempFile;

use crate::config::StorageConfiguration;
use crate::digest;
use crate::error::{StorageError, StorageResult};
use crate::generate::MetadataGenerator;
use crate::store::{LocalDiskStore, ResourceStore};

/// Coordinates versioned, write-once storage of release packages.
///
/// All operations take the package's storage coordinate as separate
/// `code_system` / `module_id` / `effective_time` arguments and validate
/// them before any I/O.
pub struct ModuleStorageCoordinator<S: ResourceStore> {
    store: S,
    cache: Option<LocalDiskStore>,
    config: StorageConfiguration,
}

impl<S: ResourceStore> ModuleStorageCoordinator<S> {
    /// Creates a coordinator with no cache.
    pub fn new(store: S, config: StorageConfiguration) -> Self {
        Self {
            store,
            cache: None,
            config,
        }
    }

    /// Adds a local-disk read cache, validated by MD5 on every hit.
    pub fn with_cache(mut self, cache: LocalDiskStore) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Development coordinator: write `dev`, read `dev` then `prod`,
    /// archival enabled, cached under `cache/{store identity}`.
    pub fn init_dev(store: S) -> Self {
        let cache = default_cache(&store);
        Self::new(store, StorageConfiguration::dev()).with_cache(cache)
    }

    /// UAT coordinator: write `uat`, read `uat` then `prod`, archival
    /// enabled, cached under `cache/{store identity}`.
    pub fn init_uat(store: S) -> Self {
        let cache = default_cache(&store);
        Self::new(store, StorageConfiguration::uat()).with_cache(cache)
    }

    /// Production coordinator: write and read `prod`, archival disabled,
    /// cached under `cache/{store identity}`.
    pub fn init_prod(store: S) -> Self {
        let cache = default_cache(&store);
        Self::new(store, StorageConfiguration::prod()).with_cache(cache)
    }

    /// The environment configuration in effect.
    pub fn config(&self) -> &StorageConfiguration {
        &self.config
    }

    /// The primary store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Uploads a release package at the given coordinate.
    ///
    /// Write-once: fails with `DuplicateResource` if either the metadata
    /// or the package already exists under the write directory. Both
    /// writes are verified after the fact; if the package write cannot be
    /// confirmed, the metadata just written is rolled back best-effort.
    pub fn upload(
        &self,
        code_system: &str,
        module_id: &str,
        effective_time: &str,
        file: &std::path::Path,
    ) -> StorageResult<ModuleMetadata> {
        let coordinate = StorageCoordinate::new(code_system, module_id, effective_time)?;
        let filename = file
            .file_name()
            .and_then(|name| name.to_str())
            .ok_or_else(|| {
                StorageError::invalid(format!("package path {} has no filename", file.display()))
            })?;

        let metadata_path = coordinate.metadata_path(&self.config.write_directory);
        let package_path = coordinate.package_path(&self.config.write_directory, filename);
        if self.exists(&metadata_path)? {
            return Err(StorageError::duplicate(metadata_path));
        }
        if self.exists(&package_path)? {
            return Err(StorageError::duplicate(package_path));
        }

        let metadata = MetadataGenerator::new(&self.store, &self.config)
            .generate(&coordinate, file)?;

        let temp = serialize_to_temp(&metadata)?;
        self.store
            .write(&metadata_path, temp.path())
            .map_err(|e| StorageError::io("writing", &metadata_path, e))?;
        if !self.exists(&metadata_path)? {
            return Err(StorageError::failed(format!(
                "metadata write to {metadata_path} could not be confirmed"
            )));
        }

        let write_error = self.store.write(&package_path, file).err();
        if write_error.is_some() || !self.exists(&package_path)? {
            // Roll back the metadata so the coordinate is not left half
            // populated; rollback failure is logged, not re-thrown.
            if let Err(e) = self.store.delete(&metadata_path) {
                tracing::warn!("failed to roll back metadata at {metadata_path}: {e}");
            }
            return Err(match write_error {
                Some(e) => StorageError::io("writing package to", &package_path, e),
                None => StorageError::failed(format!(
                    "package write to {package_path} could not be confirmed"
                )),
            });
        }

        tracing::info!("uploaded {coordinate} as {package_path}");
        Ok(metadata)
    }

    /// Fetches the metadata stored at a coordinate, optionally resolving
    /// the package bytes to a local file.
    ///
    /// Read directories are scanned in priority order; the first one
    /// holding both the metadata document and its referenced package wins,
    /// so a dev copy shadows a published prod copy of the same coordinate.
    pub fn get_metadata(
        &self,
        code_system: &str,
        module_id: &str,
        effective_time: &str,
        include_file: bool,
    ) -> StorageResult<ResolvedPackage> {
        let coordinate = StorageCoordinate::new(code_system, module_id, effective_time)?;
        self.fetch(&coordinate, include_file)
    }

    /// Fetches a release and, when requested, its transitive
    /// dependencies.
    ///
    /// With `include_dependencies`, dependencies are fetched depth-first
    /// before the requesting package, deduplicated by storage coordinate;
    /// the requested package comes last, so the result is ordered from
    /// deepest transitive dependency to the root.
    pub fn get_release(
        &self,
        code_system: &str,
        module_id: &str,
        effective_time: &str,
        include_file: bool,
        include_dependencies: bool,
    ) -> StorageResult<Vec<ResolvedPackage>> {
        let coordinate = StorageCoordinate::new(code_system, module_id, effective_time)?;
        let mut ordered = Vec::new();
        let mut seen = HashSet::new();
        self.collect_release(
            &coordinate,
            include_file,
            include_dependencies,
            &mut ordered,
            &mut seen,
        )?;
        Ok(ordered)
    }

    /// Moves a release out of the write directory into its archive
    /// location `{cs}_{m}/archive/{epochSeconds}/`.
    ///
    /// Metadata and package are copied first and deleted only after both
    /// copies succeed; a failed copy aborts before any deletion.
    pub fn archive(
        &self,
        code_system: &str,
        module_id: &str,
        effective_time: &str,
    ) -> StorageResult<()> {
        let coordinate = StorageCoordinate::new(code_system, module_id, effective_time)?;
        self.require_archive_allowed()?;

        let metadata_path = coordinate.metadata_path(&self.config.write_directory);
        if !self.exists(&metadata_path)? {
            return Err(StorageError::not_found(metadata_path));
        }
        // Malformed metadata means there is nothing coherent to archive.
        let metadata = self
            .read_metadata_document(&metadata_path)
            .map_err(|e| StorageError::not_found(format!("{metadata_path}: {e}")))?;
        let package_path =
            coordinate.package_path(&self.config.write_directory, &metadata.filename);
        if !self.exists(&package_path)? {
            return Err(StorageError::not_found(package_path));
        }

        let epoch = epoch_seconds();
        let archived_metadata = coordinate.archived_path(&metadata_path, epoch);
        let archived_package = coordinate.archived_path(&package_path, epoch);

        self.store
            .copy(&metadata_path, &archived_metadata)
            .map_err(|e| StorageError::io("copying", &metadata_path, e))?;
        self.store
            .copy(&package_path, &archived_package)
            .map_err(|e| StorageError::io("copying", &package_path, e))?;

        self.store
            .delete(&metadata_path)
            .map_err(|e| StorageError::io("deleting", &metadata_path, e))?;
        self.store
            .delete(&package_path)
            .map_err(|e| StorageError::io("deleting", &package_path, e))?;

        tracing::info!("archived {coordinate} under epoch {epoch}");
        Ok(())
    }

    /// Marks a stored release as published or unpublished.
    pub fn set_published(
        &self,
        code_system: &str,
        module_id: &str,
        effective_time: &str,
        published: bool,
    ) -> StorageResult<()> {
        self.update_metadata(code_system, module_id, effective_time, |metadata| {
            metadata.published = published;
        })
    }

    /// Overrides a stored release's edition classification.
    pub fn set_edition(
        &self,
        code_system: &str,
        module_id: &str,
        effective_time: &str,
        edition: bool,
    ) -> StorageResult<()> {
        self.update_metadata(code_system, module_id, effective_time, |metadata| {
            metadata.edition = edition;
        })
    }

    /// Versioned metadata rewrite: the prior document is copied to an
    /// epoch-stamped archive path before the replacement is uploaded, so
    /// an edit is never a destructive in-place overwrite.
    fn update_metadata(
        &self,
        code_system: &str,
        module_id: &str,
        effective_time: &str,
        mutate: impl FnOnce(&mut ModuleMetadata),
    ) -> StorageResult<()> {
        let coordinate = StorageCoordinate::new(code_system, module_id, effective_time)?;
        self.require_archive_allowed()?;

        let mut metadata = self.fetch(&coordinate, false)?.metadata;
        mutate(&mut metadata);

        let metadata_path = coordinate.metadata_path(&self.config.write_directory);
        if !self.exists(&metadata_path)? {
            return Err(StorageError::not_found(metadata_path));
        }

        let temp = serialize_to_temp(&metadata)?;
        let backup_path = coordinate.archived_path(&metadata_path, epoch_seconds());
        self.store
            .copy(&metadata_path, &backup_path)
            .map_err(|e| StorageError::io("backing up", &metadata_path, e))?;
        self.store
            .delete(&metadata_path)
            .map_err(|e| StorageError::io("deleting", &metadata_path, e))?;
        self.store
            .write(&metadata_path, temp.path())
            .map_err(|e| StorageError::io("writing", &metadata_path, e))?;
        if !self.exists(&metadata_path)? {
            return Err(StorageError::failed(format!(
                "metadata update to {metadata_path} could not be confirmed"
            )));
        }

        tracing::info!("updated metadata for {coordinate} (backup at {backup_path})");
        Ok(())
    }

    fn collect_release(
        &self,
        coordinate: &StorageCoordinate,
        include_file: bool,
        include_dependencies: bool,
        ordered: &mut Vec<ResolvedPackage>,
        seen: &mut HashSet<String>,
    ) -> StorageResult<()> {
        if !seen.insert(coordinate.to_string()) {
            return Ok(());
        }

        let package = self.fetch(coordinate, include_file)?;
        if include_dependencies {
            for dependency in &package.metadata.dependencies {
                let dependency_coordinate = dependency.coordinate().map_err(|e| {
                    StorageError::failed(format!(
                        "stored dependency of {coordinate} has an invalid coordinate: {e}"
                    ))
                })?;
                self.collect_release(
                    &dependency_coordinate,
                    include_file,
                    true,
                    ordered,
                    seen,
                )?;
            }
        }
        ordered.push(package);
        Ok(())
    }

    fn fetch(
        &self,
        coordinate: &StorageCoordinate,
        include_file: bool,
    ) -> StorageResult<ResolvedPackage> {
        for directory in &self.config.read_directories {
            let metadata_path = coordinate.metadata_path(directory);
            if !self.exists(&metadata_path)? {
                continue;
            }
            let metadata = self.read_metadata_document(&metadata_path)?;
            let package_path = coordinate.package_path(directory, &metadata.filename);
            if !self.exists(&package_path)? {
                tracing::debug!(
                    "{directory} has metadata but no package for {coordinate}, falling through"
                );
                continue;
            }

            let file = if include_file {
                Some(self.resolve_file(&package_path, &metadata)?)
            } else {
                None
            };
            return Ok(ResolvedPackage { metadata, file });
        }

        Err(StorageError::not_found(coordinate.to_string()))
    }

    /// Resolves package bytes through the cache when one is configured.
    ///
    /// A cache hit is served only if its MD5 matches the metadata's
    /// recorded digest; otherwise the primary store is fetched and the
    /// stale entry replaced. All cache maintenance is best-effort.
    fn resolve_file(
        &self,
        package_path: &str,
        metadata: &ModuleMetadata,
    ) -> StorageResult<PathBuf> {
        let Some(cache) = &self.cache else {
            return self.read_primary(package_path);
        };

        if cache.exists(package_path).unwrap_or(false) {
            if let Ok(cached) = cache.read_file(package_path) {
                match digest::file_md5(&cached) {
                    Ok(digest) if digest == metadata.file_md5 => return Ok(cached),
                    Ok(_) => tracing::warn!("stale cache entry for {package_path}, refreshing"),
                    Err(e) => tracing::warn!("cannot digest cached {package_path}: {e}"),
                }
            }
            let fresh = self.read_primary(package_path)?;
            if let Err(e) = cache
                .delete(package_path)
                .and_then(|_| cache.write(package_path, &fresh))
            {
                tracing::warn!("failed to refresh cache entry for {package_path}: {e}");
            }
            return Ok(fresh);
        }

        let fresh = self.read_primary(package_path)?;
        if let Err(e) = cache.write(package_path, &fresh) {
            tracing::warn!("failed to populate cache for {package_path}: {e}");
        }
        Ok(fresh)
    }

    fn read_primary(&self, package_path: &str) -> StorageResult<PathBuf> {
        self.store.read_file(package_path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                StorageError::not_found(package_path.to_string())
            } else {
                StorageError::io("reading", package_path, e)
            }
        })
    }

    fn read_metadata_document(&self, metadata_path: &str) -> StorageResult<ModuleMetadata> {
        let local = self
            .store
            .read_file(metadata_path)
            .map_err(|e| StorageError::io("reading", metadata_path, e))?;
        let file =
            File::open(&local).map_err(|e| StorageError::io("opening", metadata_path, e))?;
        serde_json::from_reader(BufReader::new(file)).map_err(|e| {
            StorageError::failed(format!("malformed metadata at {metadata_path}: {e}"))
        })
    }

    fn require_archive_allowed(&self) -> StorageResult<()> {
        if self.config.allow_archive {
            Ok(())
        } else {
            Err(StorageError::failed(
                "archive operations are disabled for this configuration",
            ))
        }
    }

    fn exists(&self, path: &str) -> StorageResult<bool> {
        self.store
            .exists(path)
            .map_err(|e| StorageError::io("checking", path, e))
    }
}

fn default_cache<S: ResourceStore>(store: &S) -> LocalDiskStore {
    LocalDiskStore::new(format!("cache/{}", store.identity()))
}

fn serialize_to_temp(metadata: &ModuleMetadata) -> StorageResult<NamedTempFile> {
    let mut temp = NamedTempFile::new()
        .map_err(|e| StorageError::failed(format!("creating temp metadata file: {e}")))?;
    serde_json::to_writer_pretty(&mut temp, metadata)
        .map_err(|e| StorageError::failed(format!("serializing metadata: {e}")))?;
    temp.flush()
        .map_err(|e| StorageError::failed(format!("flushing temp metadata file: {e}")))?;
    Ok(temp)
}

fn epoch_seconds() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::LocalDiskStore;

    #[test]
    fn test_presets_wire_directories_and_cache() {
        let dev = ModuleStorageCoordinator::init_dev(LocalDiskStore::new("/tmp/releases"));
        assert_eq!(dev.config().write_directory, "dev");
        assert!(dev.config().allow_archive);
        assert!(dev.cache.is_some());

        let prod = ModuleStorageCoordinator::init_prod(LocalDiskStore::new("/tmp/releases"));
        assert_eq!(prod.config().read_directories, vec!["prod"]);
        assert!(!prod.config().allow_archive);
    }

    #[test]
    fn test_invalid_arguments_rejected_before_io() {
        let coordinator = ModuleStorageCoordinator::new(
            LocalDiskStore::new("/nonexistent/store"),
            StorageConfiguration::dev(),
        );

        // The store root does not exist; only argument validation can
        // produce these errors.
        let result = coordinator.get_metadata("", "123", "20240101", false);
        assert!(matches!(result, Err(StorageError::InvalidArguments { .. })));

        let result = coordinator.get_metadata("SNOMEDCT", "123", "2024", false);
        assert!(matches!(result, Err(StorageError::InvalidArguments { .. })));

        let result = coordinator.archive("SNOMEDCT", "123", "202401xx");
        assert!(matches!(result, Err(StorageError::InvalidArguments { .. })));
    }

    #[test]
    fn test_archive_disabled_in_prod() {
        let coordinator = ModuleStorageCoordinator::new(
            LocalDiskStore::new("/nonexistent/store"),
            StorageConfiguration::prod(),
        );

        let result = coordinator.archive("SNOMEDCT", "123", "20240101");
        assert!(matches!(result, Err(StorageError::OperationFailed { .. })));

        let result = coordinator.set_published("SNOMEDCT", "123", "20240101", true);
        assert!(matches!(result, Err(StorageError::OperationFailed { .. })));
    }
}
