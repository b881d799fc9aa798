//! Well-known SNOMED CT module identifiers.
//!
//! Module ids appear in RF2 files as opaque decimal strings; the storage
//! engine only ever compares them, so they are kept as `&str` constants
//! rather than numeric SCTIDs.
//!
//! # Examples
//!
//! ```
//! use module_storage_types::well_known;
//!
//! assert_eq!(well_known::SNOMED_CT_CORE_MODULE, "900000000000207008");
//! ```

/// SNOMED CT core module (900000000000207008).
///
/// Carries the International Edition's clinical content; the International
/// Edition is filed under this module.
pub const SNOMED_CT_CORE_MODULE: &str = "900000000000207008";

/// SNOMED CT model component module (900000000000012004).
///
/// The root of every module dependency graph: all modules ultimately
/// depend on it. A package whose composition includes this module is
/// self-contained and is classified as an edition.
pub const SNOMED_CT_MODEL_COMPONENT_MODULE: &str = "900000000000012004";

/// US National Library of Medicine maintained module (731000124108).
///
/// Identifying module of the SNOMED CT United States Edition.
pub const US_EDITION_MODULE: &str = "731000124108";
