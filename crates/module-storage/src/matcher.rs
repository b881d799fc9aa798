//! Dependency matching predicates.
//!
//! Pure predicates deciding whether a stored package "owns" a Module
//! Dependency row's target module. Different resolution phases apply
//! different strategies; all of them are side-effect free over
//! (candidate metadata, dependency row) pairs.

use std::collections::HashSet;

use module_storage_types::{ModuleDependencyRow, ModuleMetadata};

/// How a candidate package is matched against a dependency row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchStrategy {
    /// Identifying module equals the row's referenced component or the
    /// row's own module. No effective-time check.
    LooseIdentity,

    /// Candidate is identified by, or contains, the referenced component,
    /// and the row's target effective time (when present) equals the
    /// candidate's.
    ReferencedWithTime,

    /// Candidate matches the row's source side (identifying module equals
    /// the row's module, source time absent or equal) or its target side
    /// (identifying module equals the referenced component, target time
    /// absent or equal).
    EitherDirectionWithTime,

    /// Candidate's composition contains the referenced component and the
    /// row's target effective time (when present) equals the candidate's.
    CompositionWithTime,
}

impl MatchStrategy {
    /// Returns true if `candidate` owns the module `row` depends on (or,
    /// for the source side, is the package the row belongs to).
    pub fn matches(&self, candidate: &ModuleMetadata, row: &ModuleDependencyRow) -> bool {
        let identifying = candidate.identifying_module_id.as_str();
        match self {
            Self::LooseIdentity => {
                identifying == row.referenced_component_id || identifying == row.module_id
            }
            Self::ReferencedWithTime => {
                (identifying == row.referenced_component_id
                    || candidate.composition_contains(&row.referenced_component_id))
                    && row.target_matches(candidate.effective_time)
            }
            Self::EitherDirectionWithTime => {
                (identifying == row.module_id && row.source_matches(candidate.effective_time))
                    || (identifying == row.referenced_component_id
                        && row.target_matches(candidate.effective_time))
            }
            Self::CompositionWithTime => {
                candidate.composition_contains(&row.referenced_component_id)
                    && row.target_matches(candidate.effective_time)
            }
        }
    }
}

/// Keeps the candidates that match at least one of `rows` under
/// `strategy`.
pub fn filter_matching(
    strategy: MatchStrategy,
    candidates: &[ModuleMetadata],
    rows: &[ModuleDependencyRow],
) -> Vec<ModuleMetadata> {
    candidates
        .iter()
        .filter(|candidate| rows.iter().any(|row| strategy.matches(candidate, row)))
        .cloned()
        .collect()
}

/// [`MatchStrategy::EitherDirectionWithTime`] filtering with a retry for
/// packages staged before their own effective time is recorded.
///
/// If some `(moduleId, sourceEffectiveTime)` pair among `rows` has no
/// matching candidate, every row without a source effective time is
/// duplicated once per caller-supplied transient time and the filter is
/// re-applied over the expanded row set.
pub fn filter_with_transient_times(
    candidates: &[ModuleMetadata],
    rows: &[ModuleDependencyRow],
    transient_times: &[String],
) -> Vec<ModuleMetadata> {
    let strategy = MatchStrategy::EitherDirectionWithTime;

    let mut unmatched_pairs: HashSet<(&str, Option<&str>)> = rows
        .iter()
        .map(|row| (row.module_id.as_str(), row.source_effective_time.as_deref()))
        .collect();
    for row in rows {
        if candidates
            .iter()
            .any(|candidate| strategy.matches(candidate, row))
        {
            unmatched_pairs.remove(&(row.module_id.as_str(), row.source_effective_time.as_deref()));
        }
    }

    if unmatched_pairs.is_empty() {
        return filter_matching(strategy, candidates, rows);
    }

    tracing::debug!(
        "{} dependency pair(s) unmatched, retrying with {} transient effective time(s)",
        unmatched_pairs.len(),
        transient_times.len()
    );

    let mut expanded = rows.to_vec();
    for row in rows.iter().filter(|r| r.source_effective_time.is_none()) {
        for time in transient_times {
            expanded.push(row.with_source_effective_time(time));
        }
    }
    filter_matching(strategy, candidates, &expanded)
}

/// Strict exact-pair matching, used where ambiguity must be eliminated.
///
/// Builds the set of `(referencedComponentId, targetEffectiveTime)` pairs
/// from `rows` and keeps only the candidates whose
/// `(identifyingModuleId, effectiveTime)` pair is in that set. Rows
/// without a target effective time contribute no pair.
pub fn filter_exact_pairs(
    candidates: &[ModuleMetadata],
    rows: &[ModuleDependencyRow],
) -> Vec<ModuleMetadata> {
    let pairs: HashSet<(&str, &str)> = rows
        .iter()
        .filter_map(|row| {
            row.target_effective_time
                .as_deref()
                .map(|time| (row.referenced_component_id.as_str(), time))
        })
        .collect();

    candidates
        .iter()
        .filter(|candidate| {
            let time = candidate.effective_time.to_string();
            pairs.contains(&(candidate.identifying_module_id.as_str(), time.as_str()))
        })
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(identifying: &str, composition: &[&str], effective_time: u32) -> ModuleMetadata {
        ModuleMetadata {
            filename: format!("{identifying}_{effective_time}.zip"),
            code_system_short_name: "SNOMEDCT".to_string(),
            identifying_module_id: identifying.to_string(),
            composition_module_ids: composition.iter().map(|m| m.to_string()).collect(),
            effective_time,
            file_time_stamp: 0,
            file_md5: String::new(),
            published: false,
            edition: false,
            dependencies: Vec::new(),
        }
    }

    const CORE: &str = "900000000000207008";
    const MODEL: &str = "900000000000012004";
    const US: &str = "731000124108";

    #[test]
    fn test_loose_identity_matches_either_column() {
        let strategy = MatchStrategy::LooseIdentity;
        let row = ModuleDependencyRow::new(US, CORE, "20240301", "20240101");

        assert!(strategy.matches(&candidate(CORE, &[CORE], 19990101), &row));
        assert!(strategy.matches(&candidate(US, &[US], 19990101), &row));
        assert!(!strategy.matches(&candidate(MODEL, &[MODEL], 20240101), &row));
    }

    #[test]
    fn test_referenced_with_time_requires_target_time() {
        let strategy = MatchStrategy::ReferencedWithTime;
        let row = ModuleDependencyRow::new(US, CORE, "20240301", "20240101");

        // Identified by the referenced component, right time.
        assert!(strategy.matches(&candidate(CORE, &[CORE], 20240101), &row));
        // Contains the referenced component, right time.
        assert!(strategy.matches(&candidate(MODEL, &[MODEL, CORE], 20240101), &row));
        // Right module, wrong time.
        assert!(!strategy.matches(&candidate(CORE, &[CORE], 20230901), &row));

        // Absent target time matches any candidate time.
        let open_row = ModuleDependencyRow::new(US, CORE, "20240301", "");
        assert!(strategy.matches(&candidate(CORE, &[CORE], 20230901), &open_row));
    }

    #[test]
    fn test_either_direction_with_time() {
        let strategy = MatchStrategy::EitherDirectionWithTime;
        let row = ModuleDependencyRow::new(US, CORE, "20240301", "20240101");

        // Source side: the depending package itself.
        assert!(strategy.matches(&candidate(US, &[US], 20240301), &row));
        assert!(!strategy.matches(&candidate(US, &[US], 20240101), &row));
        // Target side: the depended-upon package.
        assert!(strategy.matches(&candidate(CORE, &[CORE], 20240101), &row));
        assert!(!strategy.matches(&candidate(CORE, &[CORE], 20240301), &row));
        // Composition containment is not enough for this strategy.
        assert!(!strategy.matches(&candidate(MODEL, &[MODEL, CORE], 20240101), &row));
    }

    #[test]
    fn test_composition_with_time() {
        let strategy = MatchStrategy::CompositionWithTime;
        let row = ModuleDependencyRow::new(US, CORE, "", "20240101");

        assert!(strategy.matches(&candidate(MODEL, &[MODEL, CORE], 20240101), &row));
        assert!(!strategy.matches(&candidate(MODEL, &[MODEL, CORE], 20230901), &row));
        assert!(!strategy.matches(&candidate(MODEL, &[MODEL], 20240101), &row));
    }

    #[test]
    fn test_filter_matching_keeps_candidates_matching_any_row() {
        let candidates = vec![
            candidate(CORE, &[CORE, MODEL], 20240101),
            candidate(US, &[US], 20240301),
            candidate(MODEL, &[MODEL], 19990101),
        ];
        let rows = vec![
            ModuleDependencyRow::new(US, CORE, "20240301", "20240101"),
            ModuleDependencyRow::new(US, MODEL, "20240301", "20240101"),
        ];

        let matched = filter_matching(MatchStrategy::EitherDirectionWithTime, &candidates, &rows);
        let names: Vec<&str> = matched
            .iter()
            .map(|m| m.identifying_module_id.as_str())
            .collect();
        assert_eq!(names, vec![CORE, US]);
    }

    #[test]
    fn test_transient_retry_not_triggered_when_all_pairs_match() {
        let candidates = vec![candidate(US, &[US], 20240301)];
        let rows = vec![ModuleDependencyRow::new(US, CORE, "20240301", "20240101")];

        let matched =
            filter_with_transient_times(&candidates, &rows, &["20990101".to_string()]);
        assert_eq!(matched.len(), 1);
    }

    #[test]
    fn test_transient_retry_keeps_matches_from_expanded_rows() {
        // A pair no candidate matches ("0001..." at a never-stored time)
        // triggers the retry; the staged empty-source row is duplicated
        // per transient time and both real matches survive re-filtering.
        let candidates = vec![
            candidate(US, &[US], 20240901),
            candidate(CORE, &[CORE], 20240101),
        ];
        let rows = vec![
            ModuleDependencyRow::new(US, CORE, "", "20240101"),
            ModuleDependencyRow::new("000111000", MODEL, "20230901", "20230901"),
        ];

        let matched =
            filter_with_transient_times(&candidates, &rows, &["20240901".to_string()]);
        let names: Vec<&str> = matched
            .iter()
            .map(|m| m.identifying_module_id.as_str())
            .collect();
        assert_eq!(names, vec![US, CORE]);
    }

    #[test]
    fn test_transient_retry_expands_only_empty_source_rows() {
        let candidates = vec![candidate(US, &[US], 20240901)];
        // Recorded source time that matches nothing; no empty-source rows
        // to expand, so the retry cannot help.
        let rows = vec![ModuleDependencyRow::new(US, CORE, "20230901", "20240101")];

        let matched =
            filter_with_transient_times(&candidates, &rows, &["20240901".to_string()]);
        assert!(matched.is_empty());
    }

    #[test]
    fn test_filter_exact_pairs() {
        let candidates = vec![
            candidate(CORE, &[CORE], 20240101),
            candidate(CORE, &[CORE], 20230901),
            candidate(MODEL, &[MODEL], 20240101),
        ];
        let rows = vec![
            ModuleDependencyRow::new(US, CORE, "20240301", "20240101"),
            ModuleDependencyRow::new(US, MODEL, "20240301", ""),
        ];

        let matched = filter_exact_pairs(&candidates, &rows);
        assert_eq!(matched.len(), 1);
        assert_eq!(matched[0].identifying_module_id, CORE);
        assert_eq!(matched[0].effective_time, 20240101);
    }
}
