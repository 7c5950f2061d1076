// Copyright 2024 - 2026 The Gauntlet Authors

//! Coverage-driven scheduling of mutant test runs.
//!
//! Phase 1 runs every test once with capture on to build the coverage
//! matrix. Phase 2 dispatches each live mutant against exactly its covering
//! tests: static mutants run alone against the whole suite, single-test
//! mutants become small independent runs, and multi-test mutants with
//! pairwise-disjoint covering sets share one host invocation with a
//! per-test activation map (host parallelism disabled so activation stays
//! deterministic).
//!
//! Workers send results back over a channel; verdicts are applied only on
//! the scheduling thread, so a run can never change the status of a mutant
//! it was not assigned.

use std::collections::{BTreeSet, VecDeque};
use std::sync::mpsc;
use std::sync::Mutex;
use std::thread;

use anyhow::Result;
use camino::Utf8PathBuf;
use tracing::{debug, debug_span, info, warn};

use crate::coverage::CoverageMatrix;
use crate::error::EngineError;
use crate::interrupt::{check_interrupted, is_interrupted, trip};
use crate::mutant::{MutantId, MutantStatus};
use crate::options::Options;
use crate::platform::{
    CollectorSettings, PlatformSettings, RunRequest, TestCaseResult, TestId, TestOutcome,
    TestPlatform,
};
use crate::session::Session;
use crate::timeouts::Timeouts;

/// How a plan's mutants share the host invocation.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum PlanKind {
    /// One static mutant against every test.
    Static,
    /// One mutant against its single covering test.
    Single,
    /// Several mutants with disjoint covering sets in one invocation.
    Batch,
}

/// One planned host invocation.
#[derive(Clone, Debug)]
pub struct RunPlan {
    pub kind: PlanKind,
    /// Each mutant with the tests that decide its verdict.
    pub assignments: Vec<(MutantId, Vec<TestId>)>,
}

impl RunPlan {
    /// All tests this invocation must execute.
    pub fn tests(&self) -> Vec<TestId> {
        let mut tests: Vec<TestId> = Vec::new();
        for (_, assigned) in &self.assignments {
            for t in assigned {
                if !tests.contains(t) {
                    tests.push(t.clone());
                }
            }
        }
        tests
    }
}

/// Group the live mutants into host invocations.
pub fn plan_runs(session: &Session, matrix: &CoverageMatrix) -> Vec<RunPlan> {
    let all_tests: Vec<TestId> = session.tests.iter().map(|t| t.id.clone()).collect();
    let mut plans: Vec<RunPlan> = Vec::new();
    // Batches under construction, with the tests they already claim.
    let mut open_batches: Vec<(BTreeSet<TestId>, RunPlan)> = Vec::new();
    for mutant in session.pending() {
        let Some(entry) = matrix.entry(mutant.id) else {
            continue;
        };
        if entry.is_static {
            plans.push(RunPlan {
                kind: PlanKind::Static,
                assignments: vec![(mutant.id, all_tests.clone())],
            });
        } else if entry.tests.len() == 1 {
            plans.push(RunPlan {
                kind: PlanKind::Single,
                assignments: vec![(
                    mutant.id,
                    entry.tests.iter().cloned().collect(),
                )],
            });
        } else {
            let assignment = (mutant.id, entry.tests.iter().cloned().collect::<Vec<_>>());
            match open_batches
                .iter_mut()
                .find(|(claimed, _)| claimed.is_disjoint(&entry.tests))
            {
                Some((claimed, plan)) => {
                    claimed.extend(entry.tests.iter().cloned());
                    plan.assignments.push(assignment);
                }
                None => open_batches.push((
                    entry.tests.clone(),
                    RunPlan {
                        kind: PlanKind::Batch,
                        assignments: vec![assignment],
                    },
                )),
            }
        }
    }
    plans.extend(open_batches.into_iter().map(|(_, plan)| plan));
    plans
}

pub struct Scheduler<'a> {
    pub platform: &'a dyn TestPlatform,
    pub options: &'a Options,
    /// Test binaries loaded into each host.
    pub sources: &'a [Utf8PathBuf],
    /// Per-runner log files are created here when set.
    pub log_dir: Option<&'a camino::Utf8Path>,
}

impl Scheduler<'_> {
    /// Phase 1: run every test with coverage capture on and no active
    /// mutant. Fails if any test fails, since verdicts against an already
    /// failing suite are meaningless.
    pub fn run_coverage(&self, session: &Session) -> Result<Vec<TestCaseResult>> {
        let _span = debug_span!("coverage_run").entered();
        check_interrupted()?;
        let collector = CollectorSettings {
            capture_coverage: true,
            mutant_map: Vec::new(),
            helper_namespace: self.options.helper_namespace.clone(),
        };
        let mut settings = PlatformSettings::new(&collector);
        // Per-test attribution requires sequential execution in the host.
        settings.max_parallelism = 1;
        let request = RunRequest {
            sources: self.sources.to_vec(),
            settings,
            test_filter: None,
        };
        let results = self.run_with_retry(&request)?;
        let failing: Vec<&str> = results
            .iter()
            .filter(|r| r.outcome == TestOutcome::Failed)
            .map(|r| r.test.name.as_str())
            .collect();
        if !failing.is_empty() {
            return Err(EngineError::BaselineFailed(failing.join(", ")).into());
        }
        info!(tests = results.len(), "coverage run complete");
        Ok(results)
    }

    /// Phase 2: dispatch the planned runs across up to `options.jobs`
    /// workers and apply verdicts as results arrive.
    pub fn run_mutants(
        &self,
        session: &mut Session,
        matrix: &CoverageMatrix,
        timeouts: Timeouts,
    ) -> Result<()> {
        let plans = plan_runs(session, matrix);
        if plans.is_empty() {
            debug!("nothing to dispatch");
            return Ok(());
        }
        info!(plans = plans.len(), "dispatching mutant runs");
        let queue: Mutex<VecDeque<RunPlan>> = Mutex::new(plans.into());
        let (tx, rx) = mpsc::channel::<Result<(RunPlan, Vec<TestCaseResult>)>>();
        let workers = self.options.jobs;
        let mut fatal: Option<anyhow::Error> = None;
        thread::scope(|scope| {
            for worker_id in 0..workers {
                let tx = tx.clone();
                let queue = &queue;
                scope.spawn(move || {
                    let _span = debug_span!("worker", worker_id).entered();
                    // Each runner keeps its own log so output never
                    // interleaves across workers.
                    let mut log = self.log_dir.and_then(|dir| {
                        crate::log_file::LogFile::create_in(dir, &format!("runner-{worker_id}"))
                            .ok()
                    });
                    loop {
                        if is_interrupted() {
                            return;
                        }
                        let Some(plan) = queue.lock().expect("plan queue lock").pop_front()
                        else {
                            return;
                        };
                        if let Some(log) = &mut log {
                            let ids: Vec<String> = plan
                                .assignments
                                .iter()
                                .map(|(id, _)| id.to_string())
                                .collect();
                            log.message(&format!(
                                "run {:?} mutants [{}]",
                                plan.kind,
                                ids.join(",")
                            ));
                        }
                        let request = self.build_request(&plan, timeouts);
                        let outcome = self.run_with_retry(&request).map(|results| (plan, results));
                        if let (Some(log), Ok((_, results))) = (&mut log, &outcome) {
                            log.message(&format!("{} results", results.len()));
                        }
                        if tx.send(outcome).is_err() {
                            return;
                        }
                    }
                });
            }
            drop(tx);
            for message in rx {
                match message {
                    Ok((plan, results)) => {
                        apply_verdicts(session, &plan, &results, timeouts);
                    }
                    Err(err) => {
                        // Stop handing out new work; in-flight runs finish.
                        trip();
                        if fatal.is_none() {
                            fatal = Some(err);
                        }
                    }
                }
            }
        });
        if let Some(fatal) = fatal {
            return Err(fatal);
        }
        check_interrupted()?;
        Ok(())
    }

    fn build_request(&self, plan: &RunPlan, timeouts: Timeouts) -> RunRequest {
        let mutant_map = match plan.kind {
            // A single active mutant applies to every test in the run; the
            // collector presets the id for the whole session.
            PlanKind::Static | PlanKind::Single => {
                vec![(plan.assignments[0].0, Vec::new())]
            }
            PlanKind::Batch => plan.assignments.clone(),
        };
        let collector = CollectorSettings {
            capture_coverage: false,
            mutant_map,
            helper_namespace: self.options.helper_namespace.clone(),
        };
        let mut settings = PlatformSettings::new(&collector);
        settings.max_parallelism = match plan.kind {
            // Interleaved tests would make per-test activation ambiguous.
            PlanKind::Batch => 1,
            // 0 = platform default; one active mutant covers every test.
            PlanKind::Static | PlanKind::Single => 0,
        };
        let tests = plan.tests();
        settings.session_timeout =
            Some(timeouts.test.saturating_mul(tests.len() as u32 + 1));
        let test_filter = match plan.kind {
            PlanKind::Static => None,
            _ => Some(tests),
        };
        RunRequest {
            sources: self.sources.to_vec(),
            settings,
            test_filter,
        }
    }

    /// Run once, retrying a failed host with a fresh one before giving up.
    fn run_with_retry(&self, request: &RunRequest) -> Result<Vec<TestCaseResult>> {
        match self.platform.run(request) {
            Ok(results) => Ok(results),
            Err(first) => {
                warn!(?first, "test host failed; retrying with a fresh host");
                self.platform
                    .run(request)
                    .map_err(|second| EngineError::TestHostUnreachable(format!("{second:#}")).into())
            }
        }
    }
}

/// Apply the verdict rule for every mutant assigned to this plan.
///
/// Only assigned mutants are touched: a passing run is never evidence
/// about any other mutant.
fn apply_verdicts(
    session: &mut Session,
    plan: &RunPlan,
    results: &[TestCaseResult],
    timeouts: Timeouts,
) {
    for (mutant_id, assigned) in &plan.assignments {
        let relevant: Vec<&TestCaseResult> = results
            .iter()
            .filter(|r| assigned.contains(&r.test.id))
            .collect();
        let killers: Vec<TestId> = relevant
            .iter()
            .filter(|r| r.outcome == TestOutcome::Failed)
            .map(|r| r.test.id.clone())
            .collect();
        if !killers.is_empty() {
            // Earliest failing test wins for reason attribution only.
            let reason = format!("killed by {}", killers[0]);
            session.record_killers(*mutant_id, killers);
            session.set_status(*mutant_id, MutantStatus::Killed, Some(reason));
            continue;
        }
        let timed_out = relevant.iter().find(|r| {
            r.outcome == TestOutcome::TimedOut || r.duration > timeouts.test
        });
        if let Some(timed_out) = timed_out {
            session.set_status(
                *mutant_id,
                MutantStatus::Timeout,
                Some(format!("{} exceeded the timeout", timed_out.test.id)),
            );
            continue;
        }
        let passed: BTreeSet<&TestId> = relevant
            .iter()
            .filter(|r| r.outcome == TestOutcome::Passed)
            .map(|r| &r.test.id)
            .collect();
        if assigned.iter().all(|t| passed.contains(t)) {
            session.set_status(*mutant_id, MutantStatus::Survived, None);
        } else {
            warn!(
                id = %mutant_id,
                "incomplete results for assigned tests; verdict withheld"
            );
        }
    }
}
