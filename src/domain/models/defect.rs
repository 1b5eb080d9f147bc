//! Per-artifact smell reports and the aggregated round state.

use std::collections::BTreeMap;

/// Per-artifact mapping from smell kind to occurrence count, plus the
/// artifact's test-method count.
///
/// Reports are normalized on construction: a kind with count 0 is
/// equivalent to omission, so zero entries are never stored. Produced
/// once per artifact per detection pass and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SmellReport {
    counts: BTreeMap<String, u32>,
    methods: u32,
}

impl SmellReport {
    /// Build a report from raw detector counts, dropping zero entries.
    pub fn new(raw: impl IntoIterator<Item = (String, u32)>, methods: u32) -> Self {
        let counts = raw.into_iter().filter(|(_, n)| *n > 0).collect();
        Self { counts, methods }
    }

    /// True when no smell kind occurs.
    pub fn is_clean(&self) -> bool {
        self.counts.is_empty()
    }

    /// Sum of all occurrence counts.
    pub fn total(&self) -> u64 {
        self.counts.values().map(|n| u64::from(*n)).sum()
    }

    /// Number of test methods in the artifact.
    pub fn methods(&self) -> u32 {
        self.methods
    }

    /// Smell kinds present, collapsed to presence (count magnitudes are
    /// not exposed here; the rewriter receives each kind once).
    pub fn kinds(&self) -> Vec<String> {
        self.counts.keys().cloned().collect()
    }

    /// Kind-to-count entries, all counts nonzero.
    pub fn counts(&self) -> &BTreeMap<String, u32> {
        &self.counts
    }
}

/// Aggregate of all smell reports for the current artifact set at one
/// point in the loop.
///
/// Created after each detection pass, consumed to decide whether another
/// remediation round is needed, then discarded when superseded.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RoundState {
    reports: BTreeMap<String, SmellReport>,
    method_counts: BTreeMap<String, u32>,
}

impl RoundState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a detection result for an artifact.
    pub fn insert(&mut self, target: &str, report: SmellReport) {
        self.method_counts.insert(target.to_string(), report.methods());
        self.reports.insert(target.to_string(), report);
    }

    /// Whether any report carries a nonzero count.
    pub fn has_defects(&self) -> bool {
        self.reports.values().any(|r| !r.is_clean())
    }

    /// Total smell occurrences across all artifacts and kinds.
    pub fn total_defects(&self) -> u64 {
        self.reports.values().map(SmellReport::total).sum()
    }

    /// Total test methods across all artifacts with a record.
    pub fn total_methods(&self) -> u64 {
        self.method_counts.values().map(|n| u64::from(*n)).sum()
    }

    /// Number of artifacts the detector produced a record for.
    pub fn class_count(&self) -> usize {
        self.method_counts.len()
    }

    pub fn report(&self, target: &str) -> Option<&SmellReport> {
        self.reports.get(target)
    }

    /// Artifacts with at least one nonzero smell count.
    pub fn smelly(&self) -> impl Iterator<Item = (&str, &SmellReport)> {
        self.reports
            .iter()
            .filter(|(_, r)| !r.is_clean())
            .map(|(t, r)| (t.as_str(), r))
    }

    /// Per-artifact method counts, for the phase summary.
    pub fn method_counts(&self) -> &BTreeMap<String, u32> {
        &self.method_counts
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn report(kinds: &[(&str, u32)], methods: u32) -> SmellReport {
        SmellReport::new(
            kinds.iter().map(|(k, n)| ((*k).to_string(), *n)),
            methods,
        )
    }

    #[test]
    fn zero_counts_are_dropped_on_construction() {
        let r = report(&[("EagerTest", 0), ("AssertionRoulette", 2)], 5);
        assert_eq!(r.kinds(), vec!["AssertionRoulette".to_string()]);
        assert_eq!(r.total(), 2);
    }

    #[test]
    fn all_zero_report_is_clean() {
        let r = report(&[("EagerTest", 0), ("MagicNumberTest", 0)], 3);
        assert!(r.is_clean());
        assert_eq!(r.total(), 0);
    }

    #[test]
    fn round_state_aggregates() {
        let mut state = RoundState::new();
        state.insert("com.foo.Bar", report(&[("EagerTest", 2)], 4));
        state.insert("com.foo.Baz", report(&[], 7));

        assert!(state.has_defects());
        assert_eq!(state.total_defects(), 2);
        assert_eq!(state.total_methods(), 11);
        assert_eq!(state.class_count(), 2);
        assert_eq!(state.smelly().count(), 1);
    }

    #[test]
    fn clean_state_has_no_defects() {
        let mut state = RoundState::new();
        state.insert("com.foo.Bar", report(&[("EagerTest", 0)], 4));
        assert!(!state.has_defects());
        assert_eq!(state.class_count(), 1);
    }

    proptest! {
        /// `has_defects(state)` holds exactly when some raw count is > 0,
        /// regardless of how many zero entries the detector emitted.
        #[test]
        fn has_defects_iff_some_count_positive(
            artifacts in proptest::collection::btree_map(
                "[a-z]{1,8}",
                proptest::collection::btree_map("[A-Z][a-zA-Z]{1,12}", 0u32..5, 0..4),
                0..5,
            )
        ) {
            let expected = artifacts
                .values()
                .flat_map(|counts| counts.values())
                .any(|n| *n > 0);

            let mut state = RoundState::new();
            for (target, counts) in &artifacts {
                let report = SmellReport::new(
                    counts.iter().map(|(k, n)| (k.clone(), *n)),
                    1,
                );
                state.insert(target, report);
            }

            prop_assert_eq!(state.has_defects(), expected);
        }
    }
}
