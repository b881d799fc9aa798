//! Module Dependency Reference Set row type.

/// One active row from a package's Module Dependency Reference Set.
///
/// Records that `module_id` depends on `referenced_component_id` as of the
/// given source/target effective times. Empty RF2 fields are represented
/// as `None`; a package staged before its official release date carries
/// rows with no source effective time.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ModuleDependencyRow {
    /// The dependent module (the module declaring the dependency).
    pub module_id: String,
    /// The module depended upon.
    pub referenced_component_id: String,
    /// Effective time of the dependent module, if recorded.
    pub source_effective_time: Option<String>,
    /// Effective time of the depended-upon module, if recorded.
    pub target_effective_time: Option<String>,
}

impl ModuleDependencyRow {
    /// Creates a row, mapping empty effective-time fields to `None`.
    pub fn new(
        module_id: &str,
        referenced_component_id: &str,
        source_effective_time: &str,
        target_effective_time: &str,
    ) -> Self {
        Self {
            module_id: module_id.to_string(),
            referenced_component_id: referenced_component_id.to_string(),
            source_effective_time: non_empty(source_effective_time),
            target_effective_time: non_empty(target_effective_time),
        }
    }

    /// Returns true if the row's source effective time is absent or
    /// equals `effective_time`.
    pub fn source_matches(&self, effective_time: u32) -> bool {
        matches_opt(&self.source_effective_time, effective_time)
    }

    /// Returns true if the row's target effective time is absent or
    /// equals `effective_time`.
    pub fn target_matches(&self, effective_time: u32) -> bool {
        matches_opt(&self.target_effective_time, effective_time)
    }

    /// Returns a copy of this row with the given source effective time.
    pub fn with_source_effective_time(&self, effective_time: &str) -> Self {
        Self {
            source_effective_time: non_empty(effective_time),
            ..self.clone()
        }
    }
}

fn non_empty(value: &str) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

fn matches_opt(recorded: &Option<String>, effective_time: u32) -> bool {
    match recorded {
        None => true,
        Some(value) => *value == effective_time.to_string(),
    }
}
