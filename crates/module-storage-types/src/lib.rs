//! # module-storage-types
//!
//! Value types for storing and resolving SNOMED CT RF2 release packages.
//!
//! A release package is filed under a [`StorageCoordinate`]
//! (code system, identifying module, effective time) and described by a
//! [`ModuleMetadata`] record, which carries the package's module
//! composition and its resolved upstream dependencies as discovered from
//! the package's Module Dependency Reference Set.
//!
//! ## Features
//!
//! - `serde` (default): Enables serialization/deserialization support via
//!   serde. Disable this feature for zero-dependency usage of the value
//!   types (the `metadata.json` wire format requires it).

#![warn(missing_docs)]

mod coordinate;
mod mdrs;
mod metadata;
pub mod well_known;

pub use coordinate::{InvalidCoordinate, StorageCoordinate, METADATA_FILE};
pub use mdrs::ModuleDependencyRow;
pub use metadata::{ModuleMetadata, ResolvedPackage};
