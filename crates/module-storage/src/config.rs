//! Deployment environment configuration.

/// Directory wiring for one deployment environment.
///
/// Writes go to a single directory; reads fall back along an ordered
/// chain, earlier entries shadowing later ones when the same coordinate
/// exists in several (a dev copy shadows the published prod copy).
/// `allow_archive` gates archival and metadata mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageConfiguration {
    /// Directory all uploads are written to.
    pub write_directory: String,
    /// Read fallback chain, highest priority first.
    pub read_directories: Vec<String>,
    /// Whether archive and metadata-mutation operations are permitted.
    pub allow_archive: bool,
}

impl StorageConfiguration {
    /// Creates a configuration from explicit directories.
    pub fn new(write_directory: &str, read_directories: &[&str], allow_archive: bool) -> Self {
        Self {
            write_directory: write_directory.to_string(),
            read_directories: read_directories.iter().map(|d| d.to_string()).collect(),
            allow_archive,
        }
    }

    /// Development preset: write `dev`, read `dev` then `prod`, archival
    /// enabled.
    pub fn dev() -> Self {
        Self::new("dev", &["dev", "prod"], true)
    }

    /// User acceptance preset: write `uat`, read `uat` then `prod`,
    /// archival enabled.
    pub fn uat() -> Self {
        Self::new("uat", &["uat", "prod"], true)
    }

    /// Production preset: write and read `prod` only, archival disabled.
    pub fn prod() -> Self {
        Self::new("prod", &["prod"], false)
    }
}
