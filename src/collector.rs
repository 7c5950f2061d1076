// Copyright 2024 - 2026 The Gauntlet Authors

//! The coverage collector that runs inside the test host.
//!
//! The instrumented binary calls [`MutantControl::hit_normal`] and
//! [`MutantControl::hit_static`] from probe sites, and consults the active
//! mutant id to select branches. The test platform's session and test-case
//! events drive a small state machine:
//! `Idle -> Session -> InTest* -> Session -> Idle`.
//!
//! The process-wide instance behind [`control`] is genuinely global mutable
//! state, the only such state in the host. It is isolated behind this
//! module; everything else takes `&MutantControl` so tests use private
//! instances.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::Mutex;

use tracing::{debug, warn};

use crate::coverage::{format_id_list, COVERAGE_PROPERTY, OUT_OF_TESTS_PROPERTY};
use crate::mutant::MutantId;
use crate::platform::{CollectorSettings, TestId};

/// Sentinel meaning no mutant is active.
pub const NO_ACTIVE_MUTANT: i64 = -1;

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
enum Phase {
    #[default]
    Idle,
    Session,
    InTest,
}

#[derive(Debug, Default)]
struct CollectorState {
    phase: Phase,
    /// Hits from ordinary code since the current test started.
    normal_hits: BTreeSet<MutantId>,
    /// Hits from one-time initializers; drained when a test ends.
    static_hits: BTreeSet<MutantId>,
    /// Static hits seen before the first test started.
    pre_test_hits: BTreeSet<MutantId>,
    first_test_seen: bool,
    /// Per-test activation from the seed map.
    per_test_active: BTreeMap<TestId, MutantId>,
    /// Activation applying to every test (empty test list in the map).
    catch_all_active: Option<MutantId>,
    /// True when the seed map had exactly one entry and the id was preset
    /// for the whole session.
    preset: bool,
}

impl CollectorState {
    const fn new() -> CollectorState {
        CollectorState {
            phase: Phase::Idle,
            normal_hits: BTreeSet::new(),
            static_hits: BTreeSet::new(),
            pre_test_hits: BTreeSet::new(),
            first_test_seen: false,
            per_test_active: BTreeMap::new(),
            catch_all_active: None,
            preset: false,
        }
    }
}

/// Properties to attach to a finished test case.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct TestProperties {
    pub coverage: Option<String>,
    pub out_of_tests: Option<String>,
}

impl TestProperties {
    /// The map shape the test platform attaches to results.
    pub fn into_map(self) -> BTreeMap<String, String> {
        let mut map = BTreeMap::new();
        if let Some(coverage) = self.coverage {
            map.insert(COVERAGE_PROPERTY.to_owned(), coverage);
        }
        if let Some(out_of_tests) = self.out_of_tests {
            map.insert(OUT_OF_TESTS_PROPERTY.to_owned(), out_of_tests);
        }
        map
    }
}

/// The in-host runtime control for mutant selection and coverage capture.
pub struct MutantControl {
    active: AtomicI64,
    capture: AtomicBool,
    state: Mutex<CollectorState>,
}

impl Default for MutantControl {
    fn default() -> Self {
        MutantControl::new()
    }
}

impl MutantControl {
    pub const fn new() -> MutantControl {
        MutantControl {
            active: AtomicI64::new(NO_ACTIVE_MUTANT),
            capture: AtomicBool::new(false),
            state: Mutex::new(CollectorState::new()),
        }
    }

    fn state(&self) -> std::sync::MutexGuard<'_, CollectorState> {
        self.state.lock().expect("collector state lock")
    }

    /// The currently selected mutant, or [`NO_ACTIVE_MUTANT`].
    pub fn active_mutant(&self) -> i64 {
        self.active.load(Ordering::SeqCst)
    }

    /// Branch predicate used by the instrumented code.
    pub fn is_active(&self, id: MutantId) -> bool {
        self.active_mutant() == i64::from(id.0)
    }

    pub fn capture_coverage(&self) -> bool {
        self.capture.load(Ordering::SeqCst)
    }

    /// Start a host session with the decoded settings payload.
    pub fn session_start(&self, settings: &CollectorSettings) {
        let mut state = self.state();
        if state.phase != Phase::Idle {
            warn!(phase = ?state.phase, "session started while not idle; resetting");
        }
        *state = CollectorState::new();
        state.phase = Phase::Session;
        self.capture
            .store(settings.capture_coverage, Ordering::SeqCst);
        for (id, tests) in &settings.mutant_map {
            if tests.is_empty() {
                state.catch_all_active = Some(*id);
            } else {
                for test in tests {
                    state.per_test_active.insert(test.clone(), *id);
                }
            }
        }
        // With a single seeded mutant the whole run tests that mutant:
        // preset the id so even pre-test code routes through it.
        if let [(only, _)] = settings.mutant_map.as_slice() {
            state.preset = true;
            self.active.store(i64::from(only.0), Ordering::SeqCst);
            debug!(id = %only, "single-mutant session, id preset");
        } else {
            self.active.store(NO_ACTIVE_MUTANT, Ordering::SeqCst);
        }
    }

    pub fn session_end(&self) {
        let mut state = self.state();
        if state.phase == Phase::InTest {
            warn!("session ended inside a test case");
        }
        *state = CollectorState::new();
        self.active.store(NO_ACTIVE_MUTANT, Ordering::SeqCst);
        self.capture.store(false, Ordering::SeqCst);
    }

    pub fn test_case_start(&self, test: &TestId) {
        let mut state = self.state();
        match state.phase {
            Phase::Session => {}
            phase => warn!(?phase, %test, "test started out of order"),
        }
        state.phase = Phase::InTest;
        if !state.first_test_seen {
            state.first_test_seen = true;
            // Static hits before the first test are not attributable to
            // any test; they are reported separately.
            state.pre_test_hits = std::mem::take(&mut state.static_hits);
        }
        state.normal_hits.clear();
        if !self.capture_coverage() && !state.preset {
            let active = state
                .per_test_active
                .get(test)
                .copied()
                .or(state.catch_all_active);
            self.active.store(
                active.map_or(NO_ACTIVE_MUTANT, |id| i64::from(id.0)),
                Ordering::SeqCst,
            );
        }
    }

    /// Finish a test case, returning the properties to attach to it.
    pub fn test_case_end(&self, test: &TestId) -> TestProperties {
        let mut state = self.state();
        match state.phase {
            Phase::InTest => {}
            phase => warn!(?phase, %test, "test ended out of order"),
        }
        state.phase = Phase::Session;
        if !self.capture_coverage() {
            if !state.preset && !state.per_test_active.is_empty() {
                self.active.store(NO_ACTIVE_MUTANT, Ordering::SeqCst);
            }
            return TestProperties::default();
        }
        let normal = std::mem::take(&mut state.normal_hits);
        let statics = std::mem::take(&mut state.static_hits);
        let coverage = format!(
            "{};{}",
            format_id_list(&normal),
            format_id_list(&statics)
        );
        let out_of_tests = if state.pre_test_hits.is_empty() {
            None
        } else {
            let pre = std::mem::take(&mut state.pre_test_hits);
            Some(format_id_list(&pre))
        };
        TestProperties {
            coverage: Some(coverage),
            out_of_tests,
        }
    }

    /// Record a probe hit from ordinary code. Callable from any thread.
    pub fn hit_normal(&self, id: MutantId) {
        if self.capture_coverage() && self.active_mutant() == NO_ACTIVE_MUTANT {
            self.state().normal_hits.insert(id);
        }
    }

    /// Record a probe hit from a one-time initializer.
    pub fn hit_static(&self, id: MutantId) {
        if self.capture_coverage() && self.active_mutant() == NO_ACTIVE_MUTANT {
            self.state().static_hits.insert(id);
        }
    }

    /// Reset everything; test hook.
    pub fn reset(&self) {
        self.session_end();
    }
}

/// Assertion redirect for the mutated code: a tripped debug assertion must
/// fail the running test instead of halting the host, so the mutant
/// classifies as killed.
pub fn assertion_failure(message: &str) -> ! {
    panic!("assertion redirected to failure: {message}");
}

static GLOBAL: MutantControl = MutantControl::new();

/// The process-wide control instance used by the instrumented binary.
pub fn control() -> &'static MutantControl {
    &GLOBAL
}
