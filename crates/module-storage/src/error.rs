//! Storage error taxonomy.

use module_storage_types::InvalidCoordinate;
use thiserror::Error;

/// Errors raised by storage operations.
///
/// Four leaf kinds cover the whole engine: bad input rejected before any
/// I/O, an expected resource that is absent, a write-once violation, and
/// an I/O step that should have succeeded but did not.
#[derive(Error, Debug)]
pub enum StorageError {
    /// Bad or missing input, rejected before any I/O.
    #[error("invalid arguments: {reason}")]
    InvalidArguments {
        /// What was wrong with the input.
        reason: String,
    },

    /// Expected metadata, package, or dependency is absent.
    #[error("resource not found: {resource}")]
    ResourceNotFound {
        /// The missing resource (coordinate or path).
        resource: String,
    },

    /// Something already exists where upload expects nothing.
    #[error("resource already exists: {path}")]
    DuplicateResource {
        /// The occupied path.
        path: String,
    },

    /// An I/O step that should have succeeded did not: failed post-write
    /// verification, malformed metadata, digest failure, or use of a
    /// disabled operation.
    #[error("operation failed: {reason}")]
    OperationFailed {
        /// What failed.
        reason: String,
    },
}

impl StorageError {
    /// An `InvalidArguments` error.
    pub fn invalid(reason: impl Into<String>) -> Self {
        Self::InvalidArguments {
            reason: reason.into(),
        }
    }

    /// A `ResourceNotFound` error.
    pub fn not_found(resource: impl Into<String>) -> Self {
        Self::ResourceNotFound {
            resource: resource.into(),
        }
    }

    /// A `DuplicateResource` error.
    pub fn duplicate(path: impl Into<String>) -> Self {
        Self::DuplicateResource { path: path.into() }
    }

    /// An `OperationFailed` error.
    pub fn failed(reason: impl Into<String>) -> Self {
        Self::OperationFailed {
            reason: reason.into(),
        }
    }

    /// An `OperationFailed` error wrapping an I/O failure with the action
    /// and path it occurred on.
    pub fn io(action: &str, path: &str, source: std::io::Error) -> Self {
        Self::OperationFailed {
            reason: format!("{action} {path}: {source}"),
        }
    }
}

impl From<InvalidCoordinate> for StorageError {
    fn from(error: InvalidCoordinate) -> Self {
        Self::InvalidArguments {
            reason: error.to_string(),
        }
    }
}

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;
