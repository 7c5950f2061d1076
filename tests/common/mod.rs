// Copyright 2024 - 2026 The Gauntlet Authors

//! Shared fixtures: a simulated test platform whose hosts run the real
//! in-process coverage collector.

#![allow(dead_code)]

use std::time::Duration;

use anyhow::Result;
use camino::Utf8PathBuf;
use gauntlet::collector::MutantControl;
use gauntlet::mutant::{Mutant, MutantId, Mutation, MutationKind, Replacement};
use gauntlet::platform::{
    CollectorSettings, FrameworkFlags, PlatformSettings, RunRequest, TestCaseResult,
    TestDescription, TestId, TestOutcome, TestPlatform,
};
use gauntlet::span::Span;

/// What one simulated test does when it runs.
#[derive(Clone, Debug, Default)]
pub struct SimTest {
    /// Mutant sites this test executes through ordinary code.
    pub normal_sites: Vec<u32>,
    /// Mutant sites this test reaches from a one-time initializer.
    pub static_sites: Vec<u32>,
    /// Mutants whose activation makes this test fail.
    pub kills: Vec<u32>,
    pub duration: Duration,
}

impl SimTest {
    pub fn new(normal_sites: &[u32]) -> SimTest {
        SimTest {
            normal_sites: normal_sites.to_vec(),
            duration: Duration::from_millis(10),
            ..SimTest::default()
        }
    }

    pub fn with_static(mut self, sites: &[u32]) -> SimTest {
        self.static_sites = sites.to_vec();
        self
    }

    pub fn killing(mut self, mutants: &[u32]) -> SimTest {
        self.kills = mutants.to_vec();
        self
    }

    pub fn taking(mut self, duration: Duration) -> SimTest {
        self.duration = duration;
        self
    }
}

/// A test platform whose host behavior is scripted per test, with the real
/// collector handling capture, activation, and property emission.
pub struct SimPlatform {
    pub tests: Vec<(String, SimTest)>,
}

impl SimPlatform {
    pub fn new(tests: Vec<(&str, SimTest)>) -> SimPlatform {
        SimPlatform {
            tests: tests
                .into_iter()
                .map(|(name, test)| (name.to_owned(), test))
                .collect(),
        }
    }

    fn description(&self, name: &str) -> TestDescription {
        TestDescription {
            id: TestId::new(name),
            name: name.to_owned(),
            source_path: "tests/bin/Tests.dll".into(),
            framework: FrameworkFlags::NUNIT,
        }
    }
}

impl TestPlatform for SimPlatform {
    fn discover(
        &self,
        _sources: &[Utf8PathBuf],
        _settings: &PlatformSettings,
    ) -> Result<Vec<TestDescription>> {
        Ok(self
            .tests
            .iter()
            .map(|(name, _)| self.description(name))
            .collect())
    }

    fn run(&self, request: &RunRequest) -> Result<Vec<TestCaseResult>> {
        let settings = CollectorSettings::from_payload(&request.settings.collector)?;
        // Each host run gets a private control instance, like a fresh
        // host process would.
        let control = MutantControl::new();
        control.session_start(&settings);
        let mut results = Vec::new();
        for (name, script) in &self.tests {
            let test_id = TestId::new(name.as_str());
            if let Some(filter) = &request.test_filter {
                if !filter.contains(&test_id) {
                    continue;
                }
            }
            control.test_case_start(&test_id);
            for site in &script.normal_sites {
                control.hit_normal(MutantId(*site));
            }
            for site in &script.static_sites {
                control.hit_static(MutantId(*site));
            }
            let active = control.active_mutant();
            let outcome = if active >= 0 && script.kills.contains(&(active as u32)) {
                TestOutcome::Failed
            } else {
                TestOutcome::Passed
            };
            let properties = control.test_case_end(&test_id).into_map();
            results.push(TestCaseResult {
                test: self.description(name),
                outcome,
                duration: script.duration,
                properties,
            });
        }
        control.session_end();
        Ok(results)
    }
}

/// Fabricate a pending mutant for scheduler-level scenarios.
pub fn make_mutant(id: u32) -> Mutant {
    let mutation = Mutation {
        kind: MutationKind::Arithmetic,
        display: "replace + with -".to_owned(),
        replacement: Replacement::Expr(gauntlet::ast::Expr::new(gauntlet::ast::ExprKind::Int(0))),
        span: Span::quad(1, 1, 1, 2),
    };
    Mutant::new(MutantId(id), "src/calc.gx", None, &mutation)
}

/// A test description for scheduler-level scenarios.
pub fn test_desc(name: &str) -> TestDescription {
    TestDescription {
        id: TestId::new(name),
        name: name.to_owned(),
        source_path: "tests/bin/Tests.dll".into(),
        framework: FrameworkFlags::NUNIT,
    }
}
