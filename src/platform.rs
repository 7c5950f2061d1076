// Copyright 2024 - 2026 The Gauntlet Authors

//! Contracts for the external test-platform adapter.
//!
//! The engine never runs tests itself: discovery and execution happen in a
//! separate host process driven by an adapter behind [`TestPlatform`]. The
//! adapter receives a settings document carrying, among host configuration,
//! an opaque payload for the in-host coverage collector.

use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use anyhow::Result;
use camino::Utf8PathBuf;
use serde::{Deserialize, Serialize};

use crate::mutant::MutantId;

/// Opaque test-case identity. Two descriptions are the same test exactly
/// when their ids match, regardless of display name or source.
#[derive(Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TestId(pub String);

impl TestId {
    pub fn new(id: impl Into<String>) -> TestId {
        TestId(id.into())
    }
}

impl fmt::Display for TestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A discovered test case.
#[derive(Clone, Debug, Serialize)]
pub struct TestDescription {
    pub id: TestId,
    pub name: String,
    pub source_path: Utf8PathBuf,
    pub framework: FrameworkFlags,
}

impl PartialEq for TestDescription {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for TestDescription {}

impl std::hash::Hash for TestDescription {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

/// Bitset of test frameworks observed in a test source.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FrameworkFlags(pub u8);

impl FrameworkFlags {
    pub const NONE: FrameworkFlags = FrameworkFlags(0);
    pub const NUNIT: FrameworkFlags = FrameworkFlags(1);
    pub const XUNIT: FrameworkFlags = FrameworkFlags(1 << 1);
    pub const MSTEST: FrameworkFlags = FrameworkFlags(1 << 2);

    pub fn contains(self, other: FrameworkFlags) -> bool {
        self.0 & other.0 == other.0
    }

    #[must_use]
    pub fn union(self, other: FrameworkFlags) -> FrameworkFlags {
        FrameworkFlags(self.0 | other.0)
    }
}

/// Collect the union of frameworks across a set of discovered tests.
///
/// Every observed framework bit is retained, MsTest included.
pub fn detect_frameworks<'a>(
    tests: impl IntoIterator<Item = &'a TestDescription>,
) -> FrameworkFlags {
    tests
        .into_iter()
        .fold(FrameworkFlags::NONE, |acc, t| acc.union(t.framework))
}

/// Outcome of one test case as reported by the platform.
#[derive(Clone, Copy, Debug, Eq, PartialEq, strum::Display)]
pub enum TestOutcome {
    Passed,
    Failed,
    TimedOut,
    Skipped,
}

/// One test-case result from a platform run.
#[derive(Clone, Debug)]
pub struct TestCaseResult {
    pub test: TestDescription,
    pub outcome: TestOutcome,
    pub duration: Duration,
    /// Properties attached by in-host data collectors, keyed by name.
    pub properties: BTreeMap<String, String>,
}

/// Configuration payload for the in-host coverage collector, carried
/// opaquely through the platform settings and decoded inside the host.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct CollectorSettings {
    pub capture_coverage: bool,
    /// Per-test active-mutant assignments. An empty test list means the
    /// mutant is active for every test in the run.
    pub mutant_map: Vec<(MutantId, Vec<TestId>)>,
    /// Namespace of the runtime control type injected into the mutated
    /// assembly.
    pub helper_namespace: String,
}

impl CollectorSettings {
    pub fn to_payload(&self) -> String {
        serde_json::to_string(self).expect("collector settings serialize")
    }

    pub fn from_payload(payload: &str) -> Result<CollectorSettings> {
        Ok(serde_json::from_str(payload)?)
    }
}

/// Settings document handed to the test-platform adapter for one run.
#[derive(Clone, Debug, Serialize)]
pub struct PlatformSettings {
    /// Number of test hosts the platform may run in parallel. Must be 1
    /// whenever multiple mutants share a run, since per-test activation
    /// cannot be sequenced deterministically otherwise.
    pub max_parallelism: u32,
    /// Per-run session timeout, if bounded.
    pub session_timeout: Option<Duration>,
    pub target_framework: Option<String>,
    /// Omitted when the platform default (`AnyCPU`-like) applies.
    pub target_platform: Option<String>,
    pub test_case_filter: Option<String>,
    pub design_mode: bool,
    /// Opaque payload for the coverage collector.
    pub collector: String,
}

impl PlatformSettings {
    pub fn new(collector: &CollectorSettings) -> PlatformSettings {
        PlatformSettings {
            max_parallelism: 1,
            session_timeout: None,
            target_framework: None,
            target_platform: None,
            test_case_filter: None,
            design_mode: false,
            collector: collector.to_payload(),
        }
    }

    /// Render the XML-like document shape the adapter consumes.
    pub fn to_document(&self) -> String {
        let mut doc = String::new();
        doc.push_str("<RunSettings>\n  <RunConfiguration>\n");
        doc.push_str(&format!(
            "    <MaxCpuCount>{}</MaxCpuCount>\n",
            self.max_parallelism
        ));
        if let Some(timeout) = self.session_timeout {
            doc.push_str(&format!(
                "    <TestSessionTimeout>{}</TestSessionTimeout>\n",
                timeout.as_millis()
            ));
        }
        if let Some(tf) = &self.target_framework {
            doc.push_str(&format!(
                "    <TargetFrameworkVersion>{tf}</TargetFrameworkVersion>\n"
            ));
        }
        if let Some(tp) = &self.target_platform {
            doc.push_str(&format!("    <TargetPlatform>{tp}</TargetPlatform>\n"));
        }
        doc.push_str(&format!(
            "    <DesignMode>{}</DesignMode>\n",
            self.design_mode
        ));
        doc.push_str("  </RunConfiguration>\n");
        if let Some(filter) = &self.test_case_filter {
            doc.push_str(&format!(
                "  <TestCaseFilter>{filter}</TestCaseFilter>\n"
            ));
        }
        doc.push_str("  <DataCollectionRunSettings>\n    <DataCollectors>\n");
        doc.push_str("      <DataCollector friendlyName=\"GauntletCoverage\">\n");
        doc.push_str(&format!(
            "        <Configuration>{}</Configuration>\n",
            self.collector
        ));
        doc.push_str("      </DataCollector>\n");
        doc.push_str("    </DataCollectors>\n  </DataCollectionRunSettings>\n");
        doc.push_str("</RunSettings>\n");
        doc
    }
}

/// One request to execute tests in a fresh host.
#[derive(Clone, Debug)]
pub struct RunRequest {
    /// Test binaries to load.
    pub sources: Vec<Utf8PathBuf>,
    pub settings: PlatformSettings,
    /// Restrict the run to these tests; `None` runs everything.
    pub test_filter: Option<Vec<TestId>>,
}

/// The external test-platform adapter.
///
/// `run` blocks until the host session completes and returns every
/// test-case result it produced. Implementations must be callable from
/// multiple scheduler workers at once.
pub trait TestPlatform: Sync {
    fn discover(
        &self,
        sources: &[Utf8PathBuf],
        settings: &PlatformSettings,
    ) -> Result<Vec<TestDescription>>;

    fn run(&self, request: &RunRequest) -> Result<Vec<TestCaseResult>>;
}
