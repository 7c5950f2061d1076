// Copyright 2023 - 2026 The Gauntlet Authors

//! The lab drives a whole mutation session: parse, mutate, compile with
//! rollback, inject, measure coverage, schedule mutant runs, and score.

use anyhow::Result;
use camino::{Utf8Path, Utf8PathBuf};
use itertools::Itertools;
use tracing::{debug, info};

use crate::ast::RenderOptions;
use crate::console::Console;
use crate::coverage::CoverageMatrix;
use crate::error::EngineError;
use crate::frontend::Frontend;
use crate::mutant::MutantStatus;
use crate::mutators::MutatorRegistry;
use crate::options::Options;
use crate::output::{inject_binary, OutputDir};
use crate::platform::{detect_frameworks, CollectorSettings, PlatformSettings, TestPlatform};
use crate::report::SessionReport;
use crate::rollback::compile_with_rollback;
use crate::schedule::Scheduler;
use crate::score::Score;
use crate::session::{IdAllocator, Session};
use crate::timeouts::Timeouts;
use crate::visit::mutate_unit;

/// The bottom line of a whole session.
#[derive(Debug)]
pub struct LabOutcome {
    pub score: Score,
    pub exit_code: i32,
}

pub struct Lab<'a> {
    pub frontend: &'a dyn Frontend,
    pub platform: &'a dyn TestPlatform,
    pub options: Options,
    pub console: &'a Console,
}

impl Lab<'_> {
    /// Run the full pipeline over the given sources and test projects.
    ///
    /// `output_base` receives the `gauntlet.out` directory with logs, the
    /// instrumented artifact, and `report.json`.
    pub fn run(
        &self,
        sources: &[Utf8PathBuf],
        test_projects: &[Utf8PathBuf],
        output_base: &Utf8Path,
    ) -> Result<LabOutcome> {
        if test_projects.is_empty() {
            return Err(
                EngineError::ConfigurationInvalid("no test projects given".to_owned()).into(),
            );
        }
        let output = OutputDir::new(output_base)?;
        let mut session = Session::new(self.options.clone());
        let registry = MutatorRegistry::standard();
        let render_options = RenderOptions {
            helper_namespace: self.options.helper_namespace.clone(),
        };

        // Parse and mutate every source file; ids are session-global.
        let mut alloc = IdAllocator::default();
        let mut files = Vec::new();
        for path in sources {
            if !self.options.allows_source_file_path(path) {
                debug!(%path, "source file filtered out");
                continue;
            }
            let unit = self.frontend.parse(path).map_err(|err| EngineError::Parse {
                path: path.to_string(),
                message: format!("{err:#}"),
            })?;
            let sem = self.frontend.semantics(&unit);
            let fm = mutate_unit(&unit, &sem, &registry, &self.options, &mut alloc);
            debug!(
                path = %path,
                mutants = fm.mutants.len(),
                placements = fm.placements.len(),
                "file mutated"
            );
            session.mutants.extend(fm.mutants);
            files.push(fm.file);
        }
        info!(
            files = files.len(),
            mutants = session.mutants.len(),
            "discovery complete"
        );

        // Compile all mutants into one binary, excising the unviable.
        let artifact = compile_with_rollback(
            self.frontend,
            &mut files,
            &render_options,
            &output.artifact_path(),
            &mut session,
        )?;
        inject_binary(
            &artifact.binary,
            artifact.symbols.as_deref(),
            test_projects,
        )?;

        // Discover the tests that will judge the mutants.
        let discover_settings = {
            let mut settings = PlatformSettings::new(&CollectorSettings {
                capture_coverage: false,
                mutant_map: Vec::new(),
                helper_namespace: self.options.helper_namespace.clone(),
            });
            settings.design_mode = true;
            settings
        };
        session.tests = self.platform.discover(test_projects, &discover_settings)?;
        info!(
            tests = session.tests.len(),
            frameworks = ?detect_frameworks(&session.tests),
            "tests discovered"
        );

        // Coverage run, then per-mutant dispatch.
        let scheduler = Scheduler {
            platform: self.platform,
            options: &self.options,
            sources: test_projects,
            log_dir: Some(output.log_dir()),
        };
        let coverage_results = scheduler.run_coverage(&session)?;
        let matrix = CoverageMatrix::from_results(&coverage_results, &session.live_ids());
        session.apply_coverage(&matrix);
        let timeouts = Timeouts::from_coverage_run(&coverage_results, &self.options);
        scheduler.run_mutants(&mut session, &matrix, timeouts)?;

        for mutant in session
            .mutants
            .iter()
            .filter(|m| m.status != MutantStatus::Ignored)
            .sorted_by_key(|m| m.id)
        {
            self.console.mutant_result(mutant);
        }
        let score = Score::from_mutants(&session.mutants, self.options.count_uncovered);
        self.console.summarize(&score);
        output.write_report(&SessionReport::new(
            &session.mutants,
            self.options.count_uncovered,
        ))?;
        Ok(LabOutcome {
            score,
            exit_code: score.exit_code(self.options.break_at),
        })
    }
}
