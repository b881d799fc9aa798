//! # module-storage
//!
//! Versioned, write-once storage coordination for SNOMED CT RF2 release
//! packages.
//!
//! Packages are filed by (code system, identifying module, effective
//! time). On upload the engine parses the package's embedded Module
//! Dependency Reference Set, resolves every external dependency against
//! previously stored packages across an ordered read directory chain, and
//! persists a `metadata.json` document next to the archive. Fetches fall
//! back along the same chain (a dev copy shadows prod), optionally
//! through an MD5-validated local cache; archival copies before it
//! deletes; metadata edits version the prior document instead of
//! overwriting it.
//!
//! ```ignore
//! use module_storage::{LocalDiskStore, ModuleStorageCoordinator};
//!
//! let store = LocalDiskStore::new("/var/data/releases");
//! let coordinator = ModuleStorageCoordinator::init_dev(store);
//!
//! let metadata = coordinator.upload(
//!     "SNOMEDCT-US",
//!     "731000124108",
//!     "20240301",
//!     "us-release.zip".as_ref(),
//! )?;
//! println!("stored with {} dependencies", metadata.dependencies.len());
//! # Ok::<(), module_storage::StorageError>(())
//! ```

#![warn(missing_docs)]

mod config;
mod coordinator;
mod digest;
mod error;
mod generate;
mod matcher;
mod store;

pub use config::StorageConfiguration;
pub use coordinator::ModuleStorageCoordinator;
pub use error::{StorageError, StorageResult};
pub use generate::{MetadataGenerator, PACKAGE_SUFFIX};
pub use matcher::{
    filter_exact_pairs, filter_matching, filter_with_transient_times, MatchStrategy,
};
pub use store::{LocalDiskStore, ResourceStore};

// Re-export the value types for convenience
pub use module_storage_types;
pub use module_storage_types::{
    ModuleDependencyRow, ModuleMetadata, ResolvedPackage, StorageCoordinate,
};
