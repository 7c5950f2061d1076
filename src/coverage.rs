// Copyright 2024 - 2026 The Gauntlet Authors

//! The per-test coverage matrix, built from properties the in-host
//! collector attaches to each test-case result.
//!
//! The wire format is deliberately plain: `Coverage` holds
//! `"<normal_ids>;<static_ids>"` with comma-separated decimal ids and
//! either side possibly empty, and `OutOfTests` holds ids hit before the
//! first test started.

use std::collections::{BTreeMap, BTreeSet};

use tracing::warn;

use crate::mutant::MutantId;
use crate::platform::{TestCaseResult, TestId};

/// Property name for per-test coverage.
pub const COVERAGE_PROPERTY: &str = "Coverage";
/// Property name for static hits seen before any test ran.
pub const OUT_OF_TESTS_PROPERTY: &str = "OutOfTests";

/// Coverage recorded for one mutant.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct CoverageEntry {
    /// Tests whose execution reached the mutant's site.
    pub tests: BTreeSet<TestId>,
    /// The subset of `tests` that reached it from a one-time initializer.
    pub static_tests: BTreeSet<TestId>,
    /// True when the site runs from a static context; such a mutant must be
    /// exercised by every test, not just `tests`.
    pub is_static: bool,
}

/// Mapping from mutant id to the tests that covered it.
#[derive(Clone, Debug, Default)]
pub struct CoverageMatrix {
    entries: BTreeMap<MutantId, CoverageEntry>,
}

impl CoverageMatrix {
    /// Build the matrix from one coverage run.
    ///
    /// Ids that do not belong to `live` (for example mutants already rolled
    /// back) are dropped with a warning rather than invented entries.
    pub fn from_results(results: &[TestCaseResult], live: &BTreeSet<MutantId>) -> CoverageMatrix {
        let mut matrix = CoverageMatrix::default();
        for result in results {
            if let Some(coverage) = result.properties.get(COVERAGE_PROPERTY) {
                let (normal, statics) = match coverage.split_once(';') {
                    Some(pair) => pair,
                    None => (coverage.as_str(), ""),
                };
                for id in parse_id_list(normal) {
                    if live.contains(&id) {
                        matrix.record_normal(id, &result.test.id);
                    } else {
                        warn!(%id, "coverage for unknown mutant dropped");
                    }
                }
                for id in parse_id_list(statics) {
                    if live.contains(&id) {
                        matrix.record_static(id, &result.test.id);
                    } else {
                        warn!(%id, "static coverage for unknown mutant dropped");
                    }
                }
            }
            if let Some(out_of_tests) = result.properties.get(OUT_OF_TESTS_PROPERTY) {
                for id in parse_id_list(out_of_tests) {
                    if live.contains(&id) {
                        matrix.record_out_of_test(id);
                    }
                }
            }
        }
        matrix
    }

    pub fn record_normal(&mut self, id: MutantId, test: &TestId) {
        self.entries
            .entry(id)
            .or_default()
            .tests
            .insert(test.clone());
    }

    /// A static hit attributed to a test: the trigger is not test-scoped,
    /// so the mutant must later run against every test.
    pub fn record_static(&mut self, id: MutantId, test: &TestId) {
        let entry = self.entries.entry(id).or_default();
        entry.tests.insert(test.clone());
        entry.static_tests.insert(test.clone());
        entry.is_static = true;
    }

    /// A static hit seen before the first test started.
    pub fn record_out_of_test(&mut self, id: MutantId) {
        self.entries.entry(id).or_default().is_static = true;
    }

    pub fn entry(&self, id: MutantId) -> Option<&CoverageEntry> {
        self.entries.get(&id)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&MutantId, &CoverageEntry)> {
        self.entries.iter()
    }
}

/// Parse a comma-separated decimal id list; malformed entries are skipped
/// with a warning.
pub fn parse_id_list(s: &str) -> Vec<MutantId> {
    s.split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .filter_map(|part| match part.parse::<u32>() {
            Ok(id) => Some(MutantId(id)),
            Err(_) => {
                warn!(?part, "malformed mutant id in coverage list");
                None
            }
        })
        .collect()
}

/// Serialize ids to the comma-separated wire form.
pub fn format_id_list<'a>(ids: impl IntoIterator<Item = &'a MutantId>) -> String {
    itertools::Itertools::join(&mut ids.into_iter().map(|id| id.0.to_string()), ",")
}

#[cfg(test)]
mod test {
    use std::collections::BTreeMap;
    use std::time::Duration;

    use pretty_assertions::assert_eq;

    use crate::platform::{FrameworkFlags, TestDescription, TestOutcome};

    use super::*;

    fn result(test_id: &str, coverage: Option<&str>, out_of_tests: Option<&str>) -> TestCaseResult {
        let mut properties = BTreeMap::new();
        if let Some(c) = coverage {
            properties.insert(COVERAGE_PROPERTY.to_owned(), c.to_owned());
        }
        if let Some(o) = out_of_tests {
            properties.insert(OUT_OF_TESTS_PROPERTY.to_owned(), o.to_owned());
        }
        TestCaseResult {
            test: TestDescription {
                id: TestId::new(test_id),
                name: test_id.to_owned(),
                source_path: "tests/bin/Tests.dll".into(),
                framework: FrameworkFlags::NUNIT,
            },
            outcome: TestOutcome::Passed,
            duration: Duration::from_millis(10),
            properties,
        }
    }

    fn live(ids: &[u32]) -> BTreeSet<MutantId> {
        ids.iter().copied().map(MutantId).collect()
    }

    #[test]
    fn parse_id_list_handles_empty_and_garbage() {
        assert_eq!(parse_id_list(""), []);
        assert_eq!(parse_id_list("3"), [MutantId(3)]);
        assert_eq!(parse_id_list("1,2,zap,4"), [MutantId(1), MutantId(2), MutantId(4)]);
    }

    #[test]
    fn format_round_trips() {
        let ids = [MutantId(1), MutantId(9)];
        assert_eq!(format_id_list(&ids), "1,9");
        assert_eq!(parse_id_list(&format_id_list(&ids)), ids);
    }

    #[test]
    fn matrix_from_coverage_properties() {
        let results = [
            result("t1", Some("0,1;"), None),
            result("t2", Some("1;2"), None),
        ];
        let matrix = CoverageMatrix::from_results(&results, &live(&[0, 1, 2]));
        let e0 = matrix.entry(MutantId(0)).unwrap();
        assert_eq!(e0.tests, BTreeSet::from([TestId::new("t1")]));
        assert!(!e0.is_static);
        let e1 = matrix.entry(MutantId(1)).unwrap();
        assert_eq!(
            e1.tests,
            BTreeSet::from([TestId::new("t1"), TestId::new("t2")])
        );
        let e2 = matrix.entry(MutantId(2)).unwrap();
        assert!(e2.is_static);
        assert_eq!(e2.static_tests, BTreeSet::from([TestId::new("t2")]));
    }

    #[test]
    fn unknown_ids_are_dropped() {
        let results = [result("t1", Some("0,99;"), None)];
        let matrix = CoverageMatrix::from_results(&results, &live(&[0]));
        assert!(matrix.entry(MutantId(0)).is_some());
        assert!(matrix.entry(MutantId(99)).is_none());
    }

    #[test]
    fn out_of_test_hits_mark_static_without_tests() {
        let results = [result("t1", None, Some("5"))];
        let matrix = CoverageMatrix::from_results(&results, &live(&[5]));
        let e = matrix.entry(MutantId(5)).unwrap();
        assert!(e.is_static);
        assert!(e.tests.is_empty());
    }
}
